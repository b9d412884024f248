//! ABOUTME: Memory Store — extraction, freshness-weighted recall, and
//! ABOUTME: atomic upsert of episodic memories, per spec.md §4.B.

pub mod extractor;
pub mod freshness;
pub mod store;

pub use extractor::{should_extract, LlmMemoryExtractor, MemoryExtractor, NoopMemoryExtractor};
pub use freshness::{freshness_score, RECENCY_TAU_DAYS};
pub use store::MemoryStore;
