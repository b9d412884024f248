//! ABOUTME: Tool registry, ReAct agent loop, adaptive context manager, and
//! ABOUTME: quality/retry controller — components E, F, G, H of spec.md §4.

pub mod adaptive;
pub mod mermaid;
pub mod pipeline;
pub mod quality;
pub mod react;
pub mod tools;

pub use adaptive::{AdaptiveContextManager, AdaptiveQuery, RebuildReason};
pub use pipeline::{QueryOutcome, QueryPipeline, QueryRequest};
pub use quality::{QualityController, QualityVerdict};
pub use react::{AgentLoop, LoopOutcome};
pub use tools::build_default_registry;
