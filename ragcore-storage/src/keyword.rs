//! ABOUTME: Keyword (inverted) index interface — an opaque external
//! ABOUTME: collaborator per spec.md §1 Non-goals.

use async_trait::async_trait;
use ragcore_core::error::CoreError;
use ragcore_core::types::{KbId, KeywordHit};

/// One document to index.
#[derive(Debug, Clone)]
pub struct KeywordDoc {
    pub id: String,
    pub document_id: String,
    pub document_name: String,
    pub content: String,
}

/// `index(kb_id, docs)`, `delete(kb_id, doc_id)`,
/// `search(kb_id, query, limit) -> [...]`. Health probe returns a boolean
/// (spec.md §6).
#[async_trait]
pub trait KeywordIndex: Send + Sync {
    async fn index(&self, kb_id: KbId, docs: Vec<KeywordDoc>) -> Result<(), CoreError>;

    async fn delete(&self, kb_id: KbId, doc_id: &str) -> Result<(), CoreError>;

    async fn search(
        &self,
        kb_id: KbId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<KeywordHit>, CoreError>;

    /// Health probe used by the retrieval fabric to decide whether to call
    /// `search` at all. Must be a short probe, not a full search.
    async fn health(&self) -> bool;
}
