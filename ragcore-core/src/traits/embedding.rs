//! Embedding provider trait, extracted to core to avoid circular
//! dependencies between the memory, retrieval, and provider crates.

use crate::error::CoreError;
use async_trait::async_trait;

/// `embed(text) -> vector<f32, d>` where `d` is fixed per KB at creation
/// (spec.md §6 External Interfaces).
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Provider name (e.g. "openai", "local").
    fn name(&self) -> &str;

    /// Generate embeddings for a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError>;

    /// Fixed output dimensionality.
    fn dimensions(&self) -> usize;
}
