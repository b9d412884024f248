//! ABOUTME: Retrieval Fabric — uniform hybrid_search/graph_search surface
//! ABOUTME: over vector, keyword, and graph indexes with RRF fusion.

pub mod fabric;
pub mod fusion;

pub use fabric::{RetrievalFabric, SearchOptions};
pub use fusion::reciprocal_rank_fusion;
