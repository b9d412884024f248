//! ABOUTME: Core domain types, error kinds, and cross-cutting trait seams
//! ABOUTME: for the ragcore RAG query engine. Foundation layer with no
//! ABOUTME: dependency on any other workspace crate.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CoreError, Result};
pub use types::*;
