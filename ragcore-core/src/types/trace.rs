//! Execution trace — the per-query audit record. Ephemeral to a single
//! request; persistence (if any) is a caller decision, not part of the
//! contract.

use super::intent::Intent;
use serde::{Deserialize, Serialize};

/// A single retrieved result summarized for the trace (doc name, preview,
/// score) rather than carrying the full content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResultPreview {
    pub document_name: String,
    pub preview: String,
    pub score: f32,
}

/// One tool invocation as recorded in the trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: serde_json::Value,
    /// Truncated observation text, as returned to the agent loop.
    pub output: String,
}

/// The per-query audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub question: String,
    pub intent: Intent,
    pub pre_search_query: String,
    pub pre_search_results: Vec<TraceResultPreview>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub answer: String,
}

impl ExecutionTrace {
    #[must_use]
    pub const fn new(question: String, intent: Intent, pre_search_query: String) -> Self {
        Self {
            question,
            intent,
            pre_search_query,
            pre_search_results: Vec::new(),
            tool_calls: Vec::new(),
            answer: String::new(),
        }
    }
}
