//! ABOUTME: Context Engine — token-budgeted prompt assembly from memory
//! ABOUTME: recall, chat history, and retrieval, per spec.md §4.C.

pub mod engine;

pub use engine::{ContextEngine, ContextRequest, ContextResult, ContextStats};
