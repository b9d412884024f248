//! ABOUTME: Trait boundaries for the four external data planes this engine
//! ABOUTME: consumes (vector index, keyword index, graph index, relational
//! ABOUTME: store) plus in-memory fakes for this workspace's own tests.
//! ABOUTME: Physical backends are out of scope per spec.md §1.

pub mod fakes;
pub mod graph;
pub mod keyword;
pub mod relational;
pub mod vector;

pub use fakes::{InMemoryKeywordIndex, InMemoryStore, InMemoryVectorIndex, UnavailableGraphIndex};
pub use graph::{GraphIndex, GraphSnapshot};
pub use keyword::{KeywordDoc, KeywordIndex};
pub use relational::{ChatHistoryEntry, ChatSessionRow, DocumentRow, Store};
pub use vector::{VectorIndex, VectorUpsert};
