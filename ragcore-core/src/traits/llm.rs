//! LLM client trait — the two calls every higher layer (intent analysis,
//! context summarization, the ReAct loop, the quality judge, the evaluator)
//! is built on top of. Placed in core so those crates don't depend on a
//! concrete provider crate directly (spec.md §6 External Interfaces).

use crate::error::CoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One turn in a chat-style conversation handed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Request parameters common to both `complete` and `chat`. The core never
/// assumes token streaming for correctness; streaming is an implementation
/// convenience layered on top where a caller wants it.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

/// The two calls an LLM provider must support.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-shot completion: one prompt in, one text out. Used by the
    /// intent analyzer, quality judge, and evaluation judges.
    async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<String, CoreError>;

    /// Multi-turn chat, used by the ReAct agent loop. `tool_catalog` is a
    /// rendered description of the available tools, inlined into the system
    /// prompt by the caller; this trait does not interpret tool-calling
    /// protocol, it only returns the raw text trace for the caller to parse.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tool_catalog: Option<&str>,
        params: &CompletionParams,
    ) -> Result<String, CoreError>;
}
