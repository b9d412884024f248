//! ABOUTME: The evaluator's streaming protocol: line-delimited named events
//! ABOUTME: with JSON payloads (`event: <name>\ndata: <json>\n\n`), per
//! ABOUTME: spec.md §4.I. Reconnect-safety comes from persisted run state,
//! ABOUTME: not from this module — a disconnected client just re-fetches
//! ABOUTME: the run row.

use ragcore_core::types::{EvalAverages, EvalResult};
use serde_json::json;

/// One event in an evaluation run's stream. Serializes to the SSE-shaped
/// `event: <name>\ndata: <json>\n\n` wire format via `to_sse`.
#[derive(Debug, Clone)]
pub enum EvalEvent {
    Status { status: String },
    Progress { result: EvalResult, completed: usize, total: usize, averages: EvalAverages },
    Complete { averages: EvalAverages, total: usize },
    Error { message: String },
}

impl EvalEvent {
    /// Render as one SSE-shaped frame: `event: <name>\ndata: <json>\n\n`.
    #[must_use]
    pub fn to_sse(&self) -> String {
        let (name, data) = match self {
            Self::Status { status } => ("status", json!({ "status": status })),
            Self::Progress { result, completed, total, averages } => (
                "progress",
                json!({ "result": result, "completed": completed, "total": total, "averages": averages }),
            ),
            Self::Complete { averages, total } => ("complete", json!({ "averages": averages, "total": total })),
            Self::Error { message } => ("error", json!({ "message": message })),
        };
        format!("event: {name}\ndata: {data}\n\n")
    }
}
