//! ABOUTME: Central configuration management for ragcore
//! ABOUTME: Handles TOML parsing, environment variable overrides, and the
//! ABOUTME: numeric defaults named throughout the component contracts

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file discovery order, checked by callers that want
/// zero-argument startup (e.g. the CLI).
pub const CONFIG_SEARCH_PATHS: &[&str] = &["ragcore.toml", ".ragcore.toml", "config/ragcore.toml"];

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "RAGCORE_";

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Retrieval fabric tuning (component A defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub vector_top_k: usize,
    pub keyword_limit: usize,
    pub use_keyword: bool,
    pub min_vector_score: f32,
    /// RRF constant `k`.
    pub rrf_k: u32,
    /// Fusion dedup key width, in characters.
    pub fusion_prefix_width: usize,
    pub graph_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_top_k: 10,
            keyword_limit: 10,
            use_keyword: true,
            min_vector_score: 0.3,
            rrf_k: 60,
            fusion_prefix_width: 100,
            graph_timeout_secs: 60,
        }
    }
}

/// Memory store tuning (component B defaults — the freshness formula
/// constants are contracts, not free parameters, per spec.md §4.B; they are
/// hard-coded in `ragcore-memory` rather than exposed here).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub recall_k: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { recall_k: 5 }
    }
}

/// Context engine tuning (component C defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub max_tokens: usize,
    pub chars_per_token: f64,
    pub recent_turns: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            chars_per_token: 3.0,
            recent_turns: 3,
        }
    }
}

/// Agent loop and tool timeouts (components E/F/H defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_steps: usize,
    pub tool_timeout_secs: u64,
    pub web_tool_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub adaptive_rebuild_tool_calls: usize,
    pub adaptive_rebuild_token_threshold: usize,
    pub max_invalid_tool_calls: u32,
    pub max_retries: u32,
    pub retry_timeout_secs: u64,
    pub length_fallback_min_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            tool_timeout_secs: 10,
            web_tool_timeout_secs: 8,
            fetch_timeout_secs: 10,
            adaptive_rebuild_tool_calls: 3,
            adaptive_rebuild_token_threshold: 2_500,
            max_invalid_tool_calls: 3,
            max_retries: 3,
            retry_timeout_secs: 30,
            length_fallback_min_chars: 100,
        }
    }
}

/// Evaluator harness tuning (component I defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub question_timeout_secs: u64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            question_timeout_secs: 180,
        }
    }
}

/// Web search / fetch endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub search_endpoints: Vec<String>,
    pub default_timezone: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            search_endpoints: Vec::new(),
            default_timezone: "UTC".to_string(),
        }
    }
}

/// Ingestion hints (ingestion itself is out of scope; these are consumed by
/// an external ingestion pipeline, per spec.md §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionHints {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestionHints {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 64,
        }
    }
}

/// Top-level runtime configuration, threaded explicitly through
/// constructors rather than read from ambient global state (Design Notes
/// §9: "Globally-shared LLM settings").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub context: ContextConfig,
    pub agent: AgentConfig,
    pub eval: EvalConfig,
    pub web: WebConfig,
    pub ingestion: IngestionHints,
    pub vector_storage_dir: Option<String>,
    pub keyword_index_host: Option<String>,
    pub graph_index_url: Option<String>,
}

impl RuntimeConfig {
    /// Load from a TOML file on disk, then apply environment overrides.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }

    /// Parse TOML content and apply environment variable overrides.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `RAGCORE_*` environment variable overrides on top of whatever
    /// was loaded from TOML or `Default::default()`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}LLM_BASE_URL")) {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}LLM_MODEL")) {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}LLM_API_KEY")) {
            self.llm.api_key = Some(v);
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}EMBEDDING_MODEL")) {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}VECTOR_STORAGE_DIR")) {
            self.vector_storage_dir = Some(v);
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}KEYWORD_INDEX_HOST")) {
            self.keyword_index_host = Some(v);
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}GRAPH_INDEX_URL")) {
            self.graph_index_url = Some(v);
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}WEB_SEARCH_ENDPOINTS")) {
            self.web.search_endpoints = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = std::env::var(format!("{ENV_PREFIX}DEFAULT_TIMEZONE")) {
            self.web.default_timezone = v;
        }
    }

    /// Search the well-known config file locations, returning the first
    /// that exists.
    #[must_use]
    pub fn discover() -> Option<std::path::PathBuf> {
        CONFIG_SEARCH_PATHS
            .iter()
            .map(std::path::PathBuf::from)
            .find(|p| p.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.retrieval.rrf_k, 60);
        assert!((cfg.retrieval.min_vector_score - 0.3).abs() < f32::EPSILON);
        assert_eq!(cfg.retrieval.fusion_prefix_width, 100);
        assert_eq!(cfg.agent.max_steps, 10);
        assert_eq!(cfg.agent.max_retries, 3);
        assert_eq!(cfg.agent.retry_timeout_secs, 30);
    }

    #[test]
    fn env_override_takes_precedence() {
        std::env::set_var("RAGCORE_LLM_MODEL", "test-model");
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.llm.model, "test-model");
        std::env::remove_var("RAGCORE_LLM_MODEL");
    }

    #[test]
    fn parses_toml_with_partial_sections() {
        let toml_src = r#"
            [llm]
            model = "claude-test"
        "#;
        let cfg = RuntimeConfig::from_toml(toml_src).unwrap();
        assert_eq!(cfg.llm.model, "claude-test");
        assert_eq!(cfg.retrieval.rrf_k, 60);
    }
}
