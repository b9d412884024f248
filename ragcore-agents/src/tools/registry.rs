//! ABOUTME: The typed tool registry — JSON-schema-validated dispatch with
//! ABOUTME: per-tool invalid-call tracking and a hard-stop threshold.

use crate::tools::context::ToolContext;
use async_trait::async_trait;
use ragcore_core::error::CoreError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};

/// A tool: {name, JSON schema for input, async callable returning a string
/// observation} per spec.md §4.E.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn input_schema(&self) -> serde_json::Value;
    async fn call(&self, input: &serde_json::Value, ctx: &ToolContext) -> Result<String, CoreError>;
}

/// Observation returned when a tool's invalid-call streak hits the
/// configured maximum — a hard stop meant to break pathological ReAct loops
/// (spec.md §4.E, §4.F "tool returning a hard stop observation").
pub const HARD_STOP_OBSERVATION: &str =
    "HARD_STOP: this tool has received too many invalid calls in a row; stop calling it and answer with what you have.";

/// Built fresh per query, closing over the tools available to that query's
/// ReAct loop.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    max_invalid_calls: u32,
}

impl ToolRegistry {
    #[must_use]
    pub fn new(tools: Vec<Arc<dyn Tool>>, max_invalid_calls: u32) -> Self {
        Self {
            tools: tools.into_iter().map(|t| (t.name().to_string(), t)).collect(),
            max_invalid_calls,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Vec<(String, serde_json::Value)> {
        let mut entries: Vec<_> = self
            .tools
            .values()
            .map(|t| (t.name().to_string(), t.input_schema()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Render the tool catalog as a human-readable block for the system
    /// prompt (name + schema per line), used by the ReAct loop.
    #[must_use]
    pub fn render_catalog(&self) -> String {
        self.catalog()
            .into_iter()
            .map(|(name, schema)| format!("- {name}: input schema {schema}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Validate `input` against the named tool's schema, dispatch, and log
    /// the call. On validation failure, increments the tool's invalid-call
    /// streak and returns a hard-stop observation once it reaches the
    /// configured maximum, rather than erroring — the loop must be able to
    /// keep going and eventually answer.
    #[instrument(skip(self, input), fields(tool = name))]
    pub async fn dispatch(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<String, CoreError> {
        let Some(tool) = self.tools.get(name) else {
            return Err(CoreError::validation("tool_registry", format!("unknown tool: {name}")));
        };

        let schema = tool.input_schema();
        let validation = jsonschema::validate(&schema, &input);

        if let Err(err) = validation {
            let count = ctx.record_invalid_call(name);
            warn!(tool = name, count, error = %err, "invalid tool input");
            let observation = if count >= self.max_invalid_calls {
                HARD_STOP_OBSERVATION.to_string()
            } else {
                format!("invalid input for {name}: {err}")
            };
            ctx.record_call(name, input, &observation);
            return Ok(observation);
        }

        let result = tool.call(&input, ctx).await;
        match result {
            Ok(output) => {
                ctx.reset_invalid_count(name);
                ctx.record_call(name, input, &output);
                Ok(output)
            }
            Err(err) => {
                ctx.record_call(name, input, &format!("tool error: {err}"));
                Err(err)
            }
        }
    }
}
