//! ABOUTME: Vector index interface — an opaque external collaborator per
//! ABOUTME: spec.md §1 Non-goals; this crate specifies the contract only.

use async_trait::async_trait;
use ragcore_core::error::CoreError;
use ragcore_core::types::{KbId, VectorHit};
use serde_json::Value;

/// One vector to upsert.
#[derive(Debug, Clone)]
pub struct VectorUpsert {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub document_name: String,
    pub metadata: Value,
}

/// `upsert(kb_id, [...])`, `delete(kb_id, ids)`,
/// `retrieve(kb_id, query_vector, top_k) -> [...]` (spec.md §6).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, kb_id: KbId, entries: Vec<VectorUpsert>) -> Result<(), CoreError>;

    async fn delete(&self, kb_id: KbId, ids: &[String]) -> Result<(), CoreError>;

    async fn retrieve(
        &self,
        kb_id: KbId,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>, CoreError>;
}
