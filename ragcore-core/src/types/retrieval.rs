//! Normalized retrieval results and fusion bookkeeping.

use serde::{Deserialize, Serialize};

/// Which source(s) contributed to a fused result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Vector,
    Keyword,
    Both,
}

/// Whether a retrieval result is a document chunk or an extracted memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Document,
    Memory,
}

/// A normalized retrieval record. Before fusion, `score` is comparable only
/// within `origin`; after Reciprocal Rank Fusion it is a reciprocal-rank sum
/// and comparable across the whole result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,
    pub content: String,
    pub document_name: String,
    pub score: f32,
    pub content_type: ContentType,
    pub origin: Origin,
    pub metadata: serde_json::Value,
}

impl RetrievalResult {
    /// The key used to deduplicate across vector/keyword lists during RRF
    /// fusion: the first `width` characters of content, stable under
    /// trivial whitespace differences between the two indexes' copies.
    #[must_use]
    pub fn fusion_key(&self, width: usize) -> String {
        self.content.chars().take(width).collect()
    }
}

/// A single hit as returned directly by the vector index, before any
/// filtering or fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub content: String,
    pub document_name: String,
    /// Cosine similarity in [0, 1].
    pub similarity: f32,
    pub metadata: serde_json::Value,
}

/// A single hit as returned by the keyword index. Keyword hits carry a rank,
/// not a score comparable to vector similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordHit {
    pub id: String,
    pub document_id: String,
    pub document_name: String,
    pub content: String,
    pub rank: usize,
}

/// Graph-index search mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphMode {
    Local,
    Global,
    Hybrid,
    Naive,
}

/// The answer synthesized by a graph-index query, or an annotation that the
/// query fell back to hybrid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSearchOutcome {
    pub answer: String,
    pub fell_back: bool,
    pub fallback_reason: Option<String>,
}
