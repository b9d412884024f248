//! Document chunks — the immutable unit of retrievable text.

use super::kb::KbId;
use serde::{Deserialize, Serialize};

/// Distinguishes a plain text chunk from an extracted memory that has been
/// side-indexed into the vector store so it co-retrieves with document
/// chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkType {
    Text,
    Memory,
}

/// An immutable unit of retrievable text. Lives in the vector index (as
/// embedding + metadata) and the keyword index (as text + metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub kb_id: KbId,
    pub document_id: String,
    pub document_name: String,
    pub body: String,
    pub chunk_type: ChunkType,
    pub metadata: serde_json::Value,
}
