//! ABOUTME: The Context Engine — token-budgeted prompt assembly over
//! ABOUTME: memory recall, chat history, and retrieval, per spec.md §4.C.

use ragcore_config::{ContextConfig, RetrievalConfig};
use ragcore_core::error::CoreError;
use ragcore_core::types::{GraphMode, Intent, KbId, RetrievalResult, ScoredMemory};
use ragcore_memory::MemoryStore;
use ragcore_retrieval::{RetrievalFabric, SearchOptions};
use ragcore_storage::ChatHistoryEntry;
use ragcore_utils::tokens::{char_budget, estimate_tokens};
use ragcore_utils::truncate::truncate_at_boundary;
use std::sync::Arc;

/// Number of most-recent chat turns kept verbatim; anything older is folded
/// into the rolling summary section instead.
const RECENT_TURNS_DEFAULT: usize = 3;

const MEMORY_HEADER: &str = "## User Memory\n";
const HISTORY_HEADER: &str = "## Chat History\n";
const RETRIEVAL_HEADER: &str = "## Retrieval\n";
const SECTION_SEPARATOR: &str = "\n\n";

/// `build_context` request, spec.md §4.C.
pub struct ContextRequest<'a> {
    pub kb_id: KbId,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub query: &'a str,
    pub chat_history: Vec<ChatHistoryEntry>,
    pub max_tokens: usize,
    /// If the caller already has an intent, pass it so this call skips a
    /// redundant re-analysis and conditionally drops sections.
    pub intent: Option<Intent>,
}

/// Token accounting for each assembled section, for observability.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ContextStats {
    pub memory_tokens: usize,
    pub history_tokens: usize,
    pub retrieval_tokens: usize,
    pub total_tokens: usize,
}

/// `build_context` response.
pub struct ContextResult {
    pub context_string: String,
    pub memories: Vec<ScoredMemory>,
    pub rag_results: Vec<RetrievalResult>,
    pub history_summary: Option<String>,
    pub stats: ContextStats,
}

pub struct ContextEngine {
    memory: Arc<MemoryStore>,
    retrieval: Arc<RetrievalFabric>,
    config: ContextConfig,
    retrieval_config: RetrievalConfig,
}

impl ContextEngine {
    #[must_use]
    pub fn new(
        memory: Arc<MemoryStore>,
        retrieval: Arc<RetrievalFabric>,
        config: ContextConfig,
        retrieval_config: RetrievalConfig,
    ) -> Self {
        Self {
            memory,
            retrieval,
            config,
            retrieval_config,
        }
    }

    /// Build the prompt context. Four sections, each sub-budgeted, allocated
    /// in priority order: memory recall, rolling history summary, last-N
    /// turns verbatim, retrieval. A section that consumes less than its
    /// quota rolls the remainder forward to the next section; a section the
    /// intent disables contributes nothing and keeps its quota for later
    /// sections.
    pub async fn build_context(&self, req: ContextRequest<'_>) -> Result<ContextResult, CoreError> {
        let total_chars = char_budget(req.max_tokens, self.config.chars_per_token);
        let needs_memory = req.intent.as_ref().map_or(true, |i| i.needs_memory);
        let needs_retrieval = req.intent.as_ref().map_or(true, |i| i.needs_knowledge_base);
        let recent_turns = if self.config.recent_turns == 0 {
            RECENT_TURNS_DEFAULT
        } else {
            self.config.recent_turns
        };

        // Reserve the worst-case header/separator overhead up front so the
        // body quotas below can never add up to more than `total_chars`,
        // regardless of which sections end up non-empty. The `+ 1` covers
        // the newline `render_history_block` inserts between a rolling
        // summary and the verbatim turns when both are present.
        let reserved_overhead = MEMORY_HEADER.chars().count()
            + HISTORY_HEADER.chars().count()
            + RETRIEVAL_HEADER.chars().count()
            + 2 * SECTION_SEPARATOR.chars().count()
            + 1;
        let mut remaining = total_chars.saturating_sub(reserved_overhead);
        let mut stats = ContextStats::default();

        let memories = if needs_memory {
            self.memory
                .recall(req.kb_id, req.query, self.config_recall_k())
                .await?
        } else {
            Vec::new()
        };
        let memory_quota = remaining / 4;
        let memory_section = render_memory_section(&memories, memory_quota);
        remaining = remaining.saturating_sub(memory_section.chars().count());
        stats.memory_tokens = estimate_tokens(&memory_section, self.config.chars_per_token);

        let older_turns: Vec<&ChatHistoryEntry> = if req.chat_history.len() > recent_turns {
            req.chat_history[..req.chat_history.len() - recent_turns].iter().collect()
        } else {
            Vec::new()
        };
        let summary_quota = remaining / 3;
        let history_summary = render_rolling_summary(&older_turns, summary_quota);
        remaining = remaining.saturating_sub(history_summary.as_ref().map_or(0, |s| s.chars().count()));

        let recent: Vec<&ChatHistoryEntry> = if req.chat_history.len() > recent_turns {
            req.chat_history[req.chat_history.len() - recent_turns..].iter().collect()
        } else {
            req.chat_history.iter().collect()
        };
        let recent_quota = remaining / 2;
        let recent_section = render_recent_turns(&recent, recent_quota);
        remaining = remaining.saturating_sub(recent_section.chars().count());

        let history_block = render_history_block(history_summary.as_deref(), &recent_section);
        stats.history_tokens = estimate_tokens(&history_block, self.config.chars_per_token);

        let rag_results = if needs_retrieval {
            let options = SearchOptions::from(&self.retrieval_config);
            self.retrieval
                .hybrid_search(req.kb_id, req.query, &options)
                .await
        } else {
            Vec::new()
        };
        let retrieval_quota = remaining;
        let retrieval_section = render_retrieval_section(&rag_results, retrieval_quota);
        stats.retrieval_tokens = estimate_tokens(&retrieval_section, self.config.chars_per_token);

        let mut context_string = String::new();
        if !memory_section.is_empty() {
            context_string.push_str(MEMORY_HEADER);
            context_string.push_str(&memory_section);
            context_string.push_str(SECTION_SEPARATOR);
        }
        if !history_block.is_empty() {
            context_string.push_str(HISTORY_HEADER);
            context_string.push_str(&history_block);
            context_string.push_str(SECTION_SEPARATOR);
        }
        if !retrieval_section.is_empty() {
            context_string.push_str(RETRIEVAL_HEADER);
            context_string.push_str(&retrieval_section);
        }
        let context_string = context_string.trim_end().to_string();
        stats.total_tokens = estimate_tokens(&context_string, self.config.chars_per_token);

        // The graph mode of the fabric is not exercised by build_context;
        // callers needing graph answers call retrieval::graph_search
        // directly with an explicit GraphMode and merge the result in.
        let _ = GraphMode::Hybrid;

        Ok(ContextResult {
            context_string,
            memories,
            rag_results,
            history_summary,
            stats,
        })
    }

    fn config_recall_k(&self) -> usize {
        5
    }
}

fn render_memory_section(memories: &[ScoredMemory], quota: usize) -> String {
    if memories.is_empty() {
        return String::new();
    }
    let body = memories
        .iter()
        .map(|m| format!("- {}", m.memory.content))
        .collect::<Vec<_>>()
        .join("\n");
    truncate_at_boundary(&body, quota)
}

fn render_rolling_summary(older_turns: &[&ChatHistoryEntry], quota: usize) -> Option<String> {
    if older_turns.is_empty() || quota == 0 {
        return None;
    }
    // This crate does not call the LLM to produce an abstractive summary;
    // it concatenates the older turns and truncates at a sentence boundary,
    // which is the same degraded-but-correct shape an LLM summary would
    // fill if wired in by a caller with a summarization model configured.
    let joined = older_turns
        .iter()
        .map(|t| format!("{}: {}", t.role, t.content))
        .collect::<Vec<_>>()
        .join(" ");
    Some(truncate_at_boundary(&joined, quota))
}

fn render_recent_turns(recent: &[&ChatHistoryEntry], quota: usize) -> String {
    if recent.is_empty() {
        return String::new();
    }
    let body = recent
        .iter()
        .map(|t| format!("{}: {}", t.role, t.content))
        .collect::<Vec<_>>()
        .join("\n");
    truncate_at_boundary(&body, quota)
}

fn render_history_block(summary: Option<&str>, recent_section: &str) -> String {
    let mut block = String::new();
    if let Some(summary) = summary {
        if !summary.is_empty() {
            block.push_str(summary);
            block.push('\n');
        }
    }
    block.push_str(recent_section);
    block.trim().to_string()
}

fn render_retrieval_section(results: &[RetrievalResult], quota: usize) -> String {
    if results.is_empty() {
        return String::new();
    }
    let body = results
        .iter()
        .map(|r| format!("[{}] {}", r.document_name, r.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_at_boundary(&body, quota)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::traits::embedding::EmbeddingClient;
    use ragcore_core::types::{IntentTag, MemoryKind};
    use ragcore_memory::NoopMemoryExtractor;
    use ragcore_storage::{
        InMemoryKeywordIndex, InMemoryStore, InMemoryVectorIndex, UnavailableGraphIndex,
    };
    use async_trait::async_trait;
    use std::time::Duration;

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

    fn engine() -> ContextEngine {
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(StubEmbedder);
        let memory = Arc::new(MemoryStore::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryVectorIndex::new()),
            Arc::clone(&embedder),
            Arc::new(NoopMemoryExtractor),
        ));
        let retrieval = Arc::new(RetrievalFabric::new(
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(InMemoryKeywordIndex::new()),
            Arc::new(UnavailableGraphIndex),
            embedder,
            60,
            100,
            Duration::from_secs(1),
        ));
        ContextEngine::new(
            memory,
            retrieval,
            ContextConfig::default(),
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn empty_history_and_no_matches_yields_empty_shaped_sections() {
        let engine = engine();
        let kb_id = KbId::new();
        let result = engine
            .build_context(ContextRequest {
                kb_id,
                session_id: None,
                user_id: None,
                query: "hello",
                chat_history: Vec::new(),
                max_tokens: 500,
                intent: None,
            })
            .await
            .unwrap();
        assert!(result.memories.is_empty());
        assert!(result.rag_results.is_empty());
        assert!(result.history_summary.is_none());
    }

    #[tokio::test]
    async fn intent_disabling_retrieval_skips_the_fabric() {
        let engine = engine();
        let kb_id = KbId::new();
        let intent = Intent::new(IntentTag::Greeting, false, false, Vec::new(), None, 0.9);
        let result = engine
            .build_context(ContextRequest {
                kb_id,
                session_id: None,
                user_id: None,
                query: "hi",
                chat_history: Vec::new(),
                max_tokens: 500,
                intent: Some(intent),
            })
            .await
            .unwrap();
        assert!(result.rag_results.is_empty());
        assert!(!result.context_string.contains("## Retrieval"));
    }

    #[tokio::test]
    async fn recalled_memory_appears_in_context_string() {
        let engine = engine();
        let kb_id = KbId::new();
        engine
            .memory
            .upsert(ragcore_core::types::Memory::new(
                kb_id,
                None,
                None,
                "prefers concise answers".to_string(),
                MemoryKind::UserPreference,
                0.9,
            ))
            .await
            .unwrap();

        let result = engine
            .build_context(ContextRequest {
                kb_id,
                session_id: None,
                user_id: None,
                query: "how should I answer",
                chat_history: Vec::new(),
                max_tokens: 500,
                intent: None,
            })
            .await
            .unwrap();
        assert!(result.context_string.contains("## User Memory"));
        assert!(result.context_string.contains("prefers concise answers"));
    }

    #[tokio::test]
    async fn context_string_respects_total_token_budget() {
        let engine = engine();
        let kb_id = KbId::new();
        let history: Vec<ChatHistoryEntry> = (0..10)
            .map(|i| ChatHistoryEntry {
                session_id: "s1".to_string(),
                role: "user".to_string(),
                content: format!("this is turn number {i} with some padding text to fill space"),
                created_at: chrono::Utc::now(),
            })
            .collect();
        let max_tokens = 50;
        let result = engine
            .build_context(ContextRequest {
                kb_id,
                session_id: None,
                user_id: None,
                query: "summarize",
                chat_history: history,
                max_tokens,
                intent: None,
            })
            .await
            .unwrap();
        let measured_tokens = estimate_tokens(&result.context_string, ContextConfig::default().chars_per_token);
        assert!(measured_tokens <= max_tokens);
    }
}
