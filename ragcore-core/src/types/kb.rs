//! Knowledge base identity — the scope boundary for every retrieval and
//! memory operation. No operation in this workspace may cross it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a knowledge base. All retrieval, memory, and
/// evaluation operations are scoped by this id; there is no cross-KB
/// leakage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KbId(uuid::Uuid);

impl KbId {
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(id: uuid::Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> uuid::Uuid {
        self.0
    }
}

impl Default for KbId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A knowledge base: the logical root of all indexes and memories owned by
/// a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: KbId,
    pub owner_id: String,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
