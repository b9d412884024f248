//! ABOUTME: LLM and embedding provider clients. The core query pipeline
//! ABOUTME: depends only on `ragcore_core::traits::{LlmClient, EmbeddingClient}`;
//! ABOUTME: this crate supplies the concrete rig-core-backed implementation
//! ABOUTME: plus deterministic test doubles.

pub mod rig_client;
pub mod test_double;

pub use rig_client::{ProviderKind, RigEmbeddingClient, RigLlmClient};
pub use test_double::{DeterministicEmbeddingClient, DeterministicLlmClient};
