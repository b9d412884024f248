//! ABOUTME: The ReAct agent loop driver — an explicit state machine
//! ABOUTME: {AwaitingLlm, DispatchingTool, Observing, EmittingAnswer, Failed}
//! ABOUTME: per Design Notes §9, rather than one modeled on the host's
//! ABOUTME: async control flow.

use super::parser::{self, ParsedToolCall};
use crate::adaptive::AdaptiveQuery;
use crate::tools::registry::HARD_STOP_OBSERVATION;
use crate::tools::{ToolContext, ToolRegistry};
use ragcore_config::AgentConfig;
use ragcore_core::error::CoreError;
use ragcore_core::traits::llm::{ChatMessage, ChatRole, CompletionParams, LlmClient};
use ragcore_core::types::ToolCallRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

const SYSTEM_PROMPT_RULES: &str = "You are a retrieval-augmented assistant. Reason step by step and, \
when you need information, call a tool using exactly this grammar, one action per turn:\n\n\
Thought: <your reasoning>\n\
Action: <tool name>\n\
Action Input: <JSON object matching the tool's schema, or a quoted string>\n\n\
Wait for an Observation before continuing. When you have enough information, finish with:\n\n\
Answer: <your final answer to the user>\n\n\
Never invent an Observation yourself — only the host supplies those.";

/// Explicit loop states. `DispatchingTool`/`Observing` are visited every
/// iteration that executes a tool; `Failed` and `EmittingAnswer` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingLlm,
    DispatchingTool,
    Observing,
    EmittingAnswer,
    Failed,
}

/// The result of running the ReAct loop to completion (or failure).
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub answer: String,
    pub thoughts: Vec<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub final_state: LoopState,
    pub steps_taken: usize,
}

impl LoopOutcome {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.final_state, LoopState::EmittingAnswer)
    }
}

/// Maps a tool name to the JSON field a bare quoted-string `Action Input:`
/// should be parsed into, per each tool's schema in `tools::catalog`.
fn primary_input_field(tool_name: &str) -> &'static str {
    match tool_name {
        "fetch_webpage" => "url",
        "summarize_topic" => "topic",
        "generate_diagram" => "description",
        _ => "query",
    }
}

/// Drives the ReAct loop for one query, per spec.md §4.F.
pub struct AgentLoop {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    model: String,
    config: AgentConfig,
}

impl AgentLoop {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>, model: impl Into<String>, config: AgentConfig) -> Self {
        Self {
            llm,
            registry,
            model: model.into(),
            config,
        }
    }

    /// Drives the loop: prompts the LLM via `chat`, dispatches tools as
    /// their actions are parsed, feeds real observations back as user
    /// turns, and loops until an `Answer:`/diagram appears, the step limit
    /// is reached, or a hard stop is hit.
    ///
    /// `adaptive`, when attached, observes every dispatched tool call
    /// (spec.md §4.G) and may rebuild `ctx.shared_context` mid-loop; the
    /// loop itself never reads it back, it only feeds the host's adaptive
    /// hook.
    ///
    /// Honors `cancel`: checked before every LLM call; an in-flight tool
    /// call is always allowed to finish or time out before the loop exits.
    #[instrument(skip(self, ctx, chat_history, cancel, adaptive), fields(kb_id = %ctx.kb_id))]
    pub async fn chat(
        &self,
        ctx: &ToolContext,
        chat_history: &[ChatMessage],
        enriched_message: &str,
        cancel: &CancellationToken,
        mut adaptive: Option<AdaptiveQuery<'_>>,
    ) -> LoopOutcome {
        let catalog = self.registry.render_catalog();
        let mut messages: Vec<ChatMessage> = Vec::with_capacity(chat_history.len() + 2);
        messages.push(ChatMessage {
            role: ChatRole::System,
            content: SYSTEM_PROMPT_RULES.to_string(),
        });
        messages.extend_from_slice(chat_history);
        messages.push(ChatMessage {
            role: ChatRole::User,
            content: enriched_message.to_string(),
        });

        let mut thoughts_all: Vec<String> = Vec::new();
        let mut last_answer: Option<String> = None;
        let mut state = LoopState::AwaitingLlm;
        let mut steps = 0usize;
        let tool_timeout = Duration::from_secs(self.config.tool_timeout_secs);

        while steps < self.config.max_steps {
            if cancel.is_cancelled() {
                state = LoopState::Failed;
                break;
            }

            state = LoopState::AwaitingLlm;
            let raw = match self.chat_with_retry(&messages, &catalog).await {
                Ok(text) => text,
                Err(err) => {
                    warn!(error = %err, "LLM transport error outlasted retry budget");
                    state = LoopState::Failed;
                    break;
                }
            };
            messages.push(ChatMessage {
                role: ChatRole::Assistant,
                content: raw.clone(),
            });

            let trace = parser::parse_trace(&raw);
            merge_thoughts(&mut thoughts_all, &trace.thoughts);

            if let Some(answer) = trace.answer {
                last_answer = Some(answer);
                state = LoopState::EmittingAnswer;
                break;
            }

            let Some(call) = trace.tool_calls.first() else {
                // Neither an action nor an answer: nudge once more, bounded
                // by max_steps.
                messages.push(ChatMessage {
                    role: ChatRole::User,
                    content: "Continue with an Action or an Answer.".to_string(),
                });
                steps += 1;
                continue;
            };

            state = LoopState::DispatchingTool;
            let observation = self.dispatch(ctx, call, tool_timeout).await;
            if observation == HARD_STOP_OBSERVATION {
                state = LoopState::Failed;
                break;
            }

            if let Some(hook) = adaptive.as_mut() {
                hook.after_tool_call(ctx, &call.name, &observation).await;
            }

            state = LoopState::Observing;
            messages.push(ChatMessage {
                role: ChatRole::User,
                content: format!("Observation: {observation}"),
            });
            steps += 1;
        }

        if state == LoopState::AwaitingLlm {
            // while-condition exited without the body setting a terminal state.
            state = LoopState::Failed;
        }

        LoopOutcome {
            answer: last_answer.unwrap_or_default(),
            thoughts: thoughts_all,
            tool_calls: ctx.call_log(),
            final_state: state,
            steps_taken: steps,
        }
    }

    async fn dispatch(&self, ctx: &ToolContext, call: &ParsedToolCall, timeout: Duration) -> String {
        let input = parser::parse_action_input(call.raw_input.as_deref(), primary_input_field(&call.name));
        match tokio::time::timeout(timeout, self.registry.dispatch(&call.name, input, ctx)).await {
            Ok(Ok(observation)) => observation,
            Ok(Err(err)) => format!("tool error: {err}"),
            Err(_) => format!("tool {} timed out after {}s", call.name, timeout.as_secs()),
        }
    }

    /// One retry on transient LLM failure, per spec.md §7 ("LLM errors
    /// propagate after one retry").
    async fn chat_with_retry(&self, messages: &[ChatMessage], catalog: &str) -> Result<String, CoreError> {
        let params = self.completion_params();
        match self.llm.chat(messages, Some(catalog), &params).await {
            Ok(text) => Ok(text),
            Err(first_err) => {
                warn!(error = %first_err, "LLM call failed, retrying once");
                self.llm.chat(messages, Some(catalog), &params).await
            }
        }
    }

    fn completion_params(&self) -> CompletionParams {
        CompletionParams {
            model: self.model.clone(),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

fn merge_thoughts(all: &mut Vec<String>, fresh: &[String]) {
    for thought in fresh {
        if !all.contains(thought) {
            all.push(thought.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::build_default_registry;
    use async_trait::async_trait;
    use ragcore_config::{RetrievalConfig, WebConfig};
    use ragcore_core::traits::embedding::EmbeddingClient;
    use ragcore_memory::{MemoryStore, NoopMemoryExtractor};
    use ragcore_retrieval::RetrievalFabric;
    use ragcore_storage::{InMemoryKeywordIndex, InMemoryStore, InMemoryVectorIndex, UnavailableGraphIndex};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    struct StubEmbedder;
    #[async_trait]
    impl EmbeddingClient for StubEmbedder {
        fn name(&self) -> &str {
            "stub"
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
    }

    struct ScriptedLlm {
        responses: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<&'static str>) -> Self {
            Self {
                responses,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str, _params: &CompletionParams) -> Result<String, CoreError> {
            unreachable!("agent loop drives via chat()")
        }
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _tool_catalog: Option<&str>,
            _params: &CompletionParams,
        ) -> Result<String, CoreError> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.responses.get(idx).copied().unwrap_or("Answer: out of script").to_string())
        }
    }

    fn test_ctx(llm: Arc<dyn LlmClient>) -> ToolContext {
        let vector = Arc::new(InMemoryVectorIndex::new());
        let keyword = Arc::new(InMemoryKeywordIndex::new());
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(StubEmbedder);
        let fabric = Arc::new(RetrievalFabric::new(
            vector.clone(),
            keyword,
            Arc::new(UnavailableGraphIndex),
            embedder.clone(),
            60,
            100,
            StdDuration::from_secs(1),
        ));
        let store = Arc::new(InMemoryStore::new());
        let memory = Arc::new(MemoryStore::new(store.clone(), vector, embedder, Arc::new(NoopMemoryExtractor)));
        ToolContext::new(
            ragcore_core::types::KbId::new(),
            fabric,
            memory,
            store,
            llm,
            RetrievalConfig::default(),
            AgentConfig::default(),
            WebConfig::default(),
        )
    }

    #[tokio::test]
    async fn answers_directly_when_llm_skips_tools() {
        let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new(vec!["Answer: hello there"]));
        let ctx = test_ctx(llm.clone());
        let registry = Arc::new(build_default_registry(3));
        let agent = AgentLoop::new(llm, registry, "test-model", AgentConfig::default());
        let outcome = agent.chat(&ctx, &[], "## Question\nhi", &CancellationToken::new(), None).await;
        assert!(outcome.succeeded());
        assert_eq!(outcome.answer, "hello there");
        assert!(outcome.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn dispatches_tool_then_answers() {
        let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new(vec![
            "Thought: need the time\nAction: get_current_datetime\nAction Input: {}",
            "Answer: it is now",
        ]));
        let ctx = test_ctx(llm.clone());
        let registry = Arc::new(build_default_registry(3));
        let agent = AgentLoop::new(llm, registry, "test-model", AgentConfig::default());
        let outcome = agent
            .chat(&ctx, &[], "## Question\nwhat time is it", &CancellationToken::new(), None)
            .await;
        assert!(outcome.succeeded());
        assert_eq!(outcome.answer, "it is now");
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].name, "get_current_datetime");
    }

    #[tokio::test]
    async fn exceeding_max_steps_fails_with_empty_answer() {
        let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new(vec![
            "Thought: still thinking, no action, no answer yet",
            "Thought: still thinking, no action, no answer yet",
        ]));
        let ctx = test_ctx(llm.clone());
        let registry = Arc::new(build_default_registry(3));
        let mut config = AgentConfig::default();
        config.max_steps = 2;
        let agent = AgentLoop::new(llm, registry, "test-model", config);
        let outcome = agent
            .chat(&ctx, &[], "## Question\nkeep going", &CancellationToken::new(), None)
            .await;
        assert!(!outcome.succeeded());
        assert_eq!(outcome.answer, "");
    }

    #[tokio::test]
    async fn cancellation_before_first_llm_call_fails_immediately() {
        let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new(vec!["Answer: too late"]));
        let ctx = test_ctx(llm.clone());
        let registry = Arc::new(build_default_registry(3));
        let agent = AgentLoop::new(llm, registry, "test-model", AgentConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = agent.chat(&ctx, &[], "## Question\nhi", &cancel, None).await;
        assert!(!outcome.succeeded());
        assert_eq!(outcome.steps_taken, 0);
    }
}
