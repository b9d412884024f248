//! ABOUTME: Adaptive Context Manager (component G of spec.md §4): decides
//! ABOUTME: when mid-loop observations have drifted the conversation enough
//! ABOUTME: to warrant rebuilding the shared context, and performs that
//! ABOUTME: rebuild without any tool ever re-entering.

use ragcore_context::{ContextEngine, ContextRequest};
use ragcore_core::error::CoreError;
use ragcore_core::types::{Intent, KbId};
use ragcore_storage::ChatHistoryEntry;
use ragcore_utils::entities::extract_candidate_entities;
use ragcore_utils::tokens::estimate_tokens;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Why `should_update` tripped. Surfaced for logging/observability only —
/// the rebuild itself is identical regardless of reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    ToolCallCount,
    ObservationTokens,
    NewEntity,
    FollowUpMessage,
}

/// Tracks drift since the context was last built, per spec.md §4.G's
/// rebuild triggers: tool-call count, cumulative observation tokens, a
/// newly-seen named entity, or a follow-up user message.
pub struct AdaptiveContextManager {
    kb_id: KbId,
    session_id: Option<String>,
    user_id: Option<String>,
    intent: Option<Intent>,
    chat_history: Vec<ChatHistoryEntry>,
    seen_entities: HashSet<String>,
    tool_calls_since_rebuild: usize,
    observation_tokens_since_rebuild: usize,
    chars_per_token: f64,
    rebuild_tool_calls_threshold: usize,
    rebuild_token_threshold: usize,
}

impl AdaptiveContextManager {
    #[must_use]
    pub fn new(
        kb_id: KbId,
        session_id: Option<String>,
        user_id: Option<String>,
        intent: Option<Intent>,
        chat_history: Vec<ChatHistoryEntry>,
        initial_context: &str,
        chars_per_token: f64,
        rebuild_tool_calls_threshold: usize,
        rebuild_token_threshold: usize,
    ) -> Self {
        Self {
            kb_id,
            session_id,
            user_id,
            intent,
            chat_history,
            seen_entities: extract_candidate_entities(initial_context),
            tool_calls_since_rebuild: 0,
            observation_tokens_since_rebuild: 0,
            chars_per_token,
            rebuild_tool_calls_threshold,
            rebuild_token_threshold,
        }
    }

    /// Record one tool call's output. Callers feed every dispatched tool
    /// call through this so drift accumulates across the whole loop, not
    /// just since the manager was last asked.
    pub fn record_tool_call(&mut self, _name: &str, observation: &str) {
        self.tool_calls_since_rebuild += 1;
        self.observation_tokens_since_rebuild += estimate_tokens(observation, self.chars_per_token);
    }

    /// Whether drift has crossed a rebuild threshold, and why. `follow_up`
    /// is true when the caller is re-entering the loop for a new user
    /// message within the same session rather than mid-loop.
    #[must_use]
    pub fn should_update(&self, follow_up: bool) -> Option<RebuildReason> {
        if follow_up {
            return Some(RebuildReason::FollowUpMessage);
        }
        if self.tool_calls_since_rebuild >= self.rebuild_tool_calls_threshold {
            return Some(RebuildReason::ToolCallCount);
        }
        if self.observation_tokens_since_rebuild > self.rebuild_token_threshold {
            return Some(RebuildReason::ObservationTokens);
        }
        None
    }

    /// Check the latest observation for a named entity not seen in any
    /// prior context build. Does not mutate `seen_entities` — call
    /// `absorb_entities` after a successful rebuild so a rebuild that never
    /// happens doesn't silently swallow the trigger.
    #[must_use]
    pub fn has_new_entity(&self, observation: &str) -> bool {
        extract_candidate_entities(observation)
            .iter()
            .any(|entity| !self.seen_entities.contains(entity))
    }

    fn absorb_entities(&mut self, text: &str) {
        self.seen_entities.extend(extract_candidate_entities(text));
    }

    /// Re-invoke context assembly and return the rebuilt context string.
    /// Never re-enters a tool: it only re-reads memory, history, and
    /// retrieval through `engine`.
    #[instrument(skip(self, engine, query), fields(kb_id = %self.kb_id, reason = ?reason))]
    pub async fn update_context(
        &mut self,
        engine: &ContextEngine,
        query: &str,
        max_tokens: usize,
        reason: RebuildReason,
    ) -> Result<String, CoreError> {
        debug!("rebuilding shared context");
        let result = engine
            .build_context(ContextRequest {
                kb_id: self.kb_id,
                session_id: self.session_id.clone(),
                user_id: self.user_id.clone(),
                query,
                chat_history: self.chat_history.clone(),
                max_tokens,
                intent: self.intent.clone(),
            })
            .await?;

        self.absorb_entities(&result.context_string);
        self.tool_calls_since_rebuild = 0;
        self.observation_tokens_since_rebuild = 0;
        Ok(result.context_string)
    }

    pub fn push_history(&mut self, entry: ChatHistoryEntry) {
        self.chat_history.push(entry);
    }
}

/// Binds a live `AdaptiveContextManager` to the `ContextEngine` and query it
/// needs to rebuild against, for the duration of one `AgentLoop::chat` call.
/// The ReAct driver calls `after_tool_call` once per dispatched tool and
/// writes any rebuilt context straight into `ToolContext::shared_context`
/// (spec.md §4.G: "the wrapper replaces the context string in place; it
/// never re-enters the tool").
pub struct AdaptiveQuery<'a> {
    pub engine: &'a ContextEngine,
    pub manager: &'a mut AdaptiveContextManager,
    pub query: &'a str,
    pub max_tokens: usize,
}

impl<'a> AdaptiveQuery<'a> {
    #[instrument(skip(self, ctx, observation), fields(tool = name))]
    pub async fn after_tool_call(&mut self, ctx: &crate::tools::ToolContext, name: &str, observation: &str) {
        let new_entity = self.manager.has_new_entity(observation);
        self.manager.record_tool_call(name, observation);
        let reason = self
            .manager
            .should_update(false)
            .or(new_entity.then_some(RebuildReason::NewEntity));
        let Some(reason) = reason else { return };
        match self
            .manager
            .update_context(self.engine, self.query, self.max_tokens, reason)
            .await
        {
            Ok(rebuilt) => *ctx.shared_context.lock() = rebuilt,
            Err(err) => debug!(error = %err, "adaptive context rebuild failed, keeping prior context"),
        }
    }
}
