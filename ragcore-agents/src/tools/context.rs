//! ABOUTME: Tool execution context — the per-query bundle a tool closes
//! ABOUTME: over (index handles, kb id, call log, shared context string).

use parking_lot::Mutex;
use ragcore_config::{AgentConfig, RetrievalConfig, WebConfig};
use ragcore_core::traits::llm::LlmClient;
use ragcore_core::types::{KbId, ToolCallRecord};
use ragcore_memory::MemoryStore;
use ragcore_retrieval::RetrievalFabric;
use ragcore_storage::Store;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, per-query state a tool may read or append to. Built fresh for
/// every query; never shared across KBs (spec.md §5, "A tool call may only
/// observe data belonging to the KB named in its invocation").
pub struct ToolContext {
    pub kb_id: KbId,
    pub fabric: Arc<RetrievalFabric>,
    pub memory: Arc<MemoryStore>,
    pub store: Arc<dyn Store>,
    pub llm: Arc<dyn LlmClient>,
    pub retrieval_config: RetrievalConfig,
    pub agent_config: AgentConfig,
    pub web_config: WebConfig,
    pub http: reqwest::Client,
    tool_call_log: Mutex<Vec<ToolCallRecord>>,
    invalid_call_counts: Mutex<HashMap<String, u32>>,
    /// The current shared context string, replaceable in place by the
    /// adaptive context manager without any tool re-entering.
    pub shared_context: Mutex<String>,
}

impl ToolContext {
    #[must_use]
    pub fn new(
        kb_id: KbId,
        fabric: Arc<RetrievalFabric>,
        memory: Arc<MemoryStore>,
        store: Arc<dyn Store>,
        llm: Arc<dyn LlmClient>,
        retrieval_config: RetrievalConfig,
        agent_config: AgentConfig,
        web_config: WebConfig,
    ) -> Self {
        Self {
            kb_id,
            fabric,
            memory,
            store,
            llm,
            retrieval_config,
            agent_config,
            web_config,
            http: reqwest::Client::new(),
            tool_call_log: Mutex::new(Vec::new()),
            invalid_call_counts: Mutex::new(HashMap::new()),
            shared_context: Mutex::new(String::new()),
        }
    }

    /// Append one immutable record. Tool invocations within a query are
    /// strictly sequential, so the log's order matches invocation order.
    pub fn record_call(&self, name: &str, input: serde_json::Value, output: &str) {
        self.tool_call_log.lock().push(ToolCallRecord {
            name: name.to_string(),
            input,
            output: output.to_string(),
        });
    }

    #[must_use]
    pub fn call_log(&self) -> Vec<ToolCallRecord> {
        self.tool_call_log.lock().clone()
    }

    /// Increment `tool_name`'s invalid-parameter count and return the new
    /// total.
    pub fn record_invalid_call(&self, tool_name: &str) -> u32 {
        let mut counts = self.invalid_call_counts.lock();
        let entry = counts.entry(tool_name.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Reset `tool_name`'s invalid-call streak after a successful call.
    pub fn reset_invalid_count(&self, tool_name: &str) {
        self.invalid_call_counts.lock().remove(tool_name);
    }

    #[must_use]
    pub fn invalid_count(&self, tool_name: &str) -> u32 {
        *self.invalid_call_counts.lock().get(tool_name).unwrap_or(&0)
    }
}
