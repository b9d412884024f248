//! Memory — a short declarative statement extracted from a past turn.

use super::kb::KbId;
use serde::{Deserialize, Serialize};

/// The kind of a memory, as classified by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    UserPreference,
    Factual,
    Event,
    General,
}

/// A persisted memory. Also embedded into the vector index tagged
/// `type=memory` so it co-retrieves with document chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub kb_id: KbId,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub content: String,
    pub kind: MemoryKind,
    /// Importance in [0, 1].
    pub importance: f32,
    pub access_count: u32,
    pub last_accessed_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Memory {
    #[must_use]
    pub fn new(
        kb_id: KbId,
        user_id: Option<String>,
        session_id: Option<String>,
        content: String,
        kind: MemoryKind,
        importance: f32,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kb_id,
            user_id,
            session_id,
            content,
            kind,
            importance: importance.clamp(0.0, 1.0),
            access_count: 0,
            last_accessed_at: now,
            created_at: now,
        }
    }

    /// Age of this memory in days, as used by the freshness formula.
    #[must_use]
    pub fn age_days(&self, now: chrono::DateTime<chrono::Utc>) -> f64 {
        (now - self.created_at).num_seconds() as f64 / 86_400.0
    }
}

/// A memory freshly produced by the extractor, not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedMemory {
    pub content: String,
    pub kind: MemoryKind,
    pub importance: f32,
}

/// A memory recalled at query time, carrying the freshness-weighted score
/// that determined its rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub score: f32,
}
