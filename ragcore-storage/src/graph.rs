//! ABOUTME: Graph index interface — an opaque external collaborator per
//! ABOUTME: spec.md §1 Non-goals.

use async_trait::async_trait;
use ragcore_core::error::CoreError;
use ragcore_core::types::{GraphMode, KbId};
use serde::{Deserialize, Serialize};

/// Entities and relations returned by `graph()`, used for diagnostics and
/// the `generate_diagram` tool's upstream context, not by the core fusion
/// path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub entities: Vec<String>,
    pub relations: Vec<(String, String, String)>,
    pub stats: serde_json::Value,
}

/// `index(kb_id, docs)`, `query(kb_id, question, mode) -> {answer}`,
/// `graph(kb_id, limit) -> {...}`, `health() -> {status}` (spec.md §6).
#[async_trait]
pub trait GraphIndex: Send + Sync {
    async fn query(&self, kb_id: KbId, question: &str, mode: GraphMode) -> Result<String, CoreError>;

    async fn graph(&self, kb_id: KbId, limit: usize) -> Result<GraphSnapshot, CoreError>;

    async fn health(&self) -> bool;
}
