//! ABOUTME: rig-core-backed LLM and embedding clients
//! ABOUTME: Wraps rig's provider clients behind the workspace's LlmClient
//! ABOUTME: and EmbeddingClient trait seams

use async_trait::async_trait;
use ragcore_core::error::CoreError;
use ragcore_core::traits::{ChatMessage, ChatRole, CompletionParams, EmbeddingClient, LlmClient};
use rig::completion::Prompt;
use rig::providers::openai;

/// Which upstream provider a [`RigLlmClient`] talks to. Kept small and
/// closed rather than a free-form string, mirroring `RigModel` in the
/// teacher's provider crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

/// An LLM client backed by rig-core's OpenAI-compatible completion API.
///
/// Only the OpenAI-compatible path is wired up here; this crate keeps a
/// single concrete backend and documents the seam for adding more (e.g.
/// Anthropic or Cohere model enums), since provider selection is a
/// deployment concern, not a query-time one.
pub struct RigLlmClient {
    client: openai::Client,
    model: String,
}

impl RigLlmClient {
    /// Construct a client against an OpenAI-compatible endpoint.
    ///
    /// # Errors
    /// Returns [`CoreError::Configuration`] if `api_key` is empty.
    pub fn new(api_key: &str, base_url: Option<&str>, model: &str) -> Result<Self, CoreError> {
        if api_key.is_empty() {
            return Err(CoreError::Configuration(
                "LLM API key is required".to_string(),
            ));
        }
        let client = base_url.map_or_else(
            || openai::Client::new(api_key),
            |url| openai::Client::from_url(api_key, url),
        );
        Ok(Self {
            client,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<String, CoreError> {
        let agent = self
            .client
            .agent(&self.model)
            .temperature(f64::from(params.temperature))
            .max_tokens(params.max_tokens as u64)
            .build();
        agent
            .prompt(prompt)
            .await
            .map_err(|e| CoreError::transient("llm_client", e.to_string()))
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        tool_catalog: Option<&str>,
        params: &CompletionParams,
    ) -> Result<String, CoreError> {
        let mut preamble = String::new();
        if let Some(catalog) = tool_catalog {
            preamble.push_str(catalog);
            preamble.push('\n');
        }
        for m in messages {
            if m.role == ChatRole::System {
                preamble.push_str(&m.content);
                preamble.push('\n');
            }
        }

        let agent = self
            .client
            .agent(&self.model)
            .preamble(&preamble)
            .temperature(f64::from(params.temperature))
            .max_tokens(params.max_tokens as u64)
            .build();

        let last_user_turn = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map_or_else(String::new, |m| m.content.clone());

        agent
            .prompt(last_user_turn.as_str())
            .await
            .map_err(|e| CoreError::transient("llm_client", e.to_string()))
    }
}

/// An embedding client backed by rig-core's OpenAI-compatible embeddings API.
pub struct RigEmbeddingClient {
    client: openai::Client,
    model: String,
    dimensions: usize,
}

impl RigEmbeddingClient {
    /// # Errors
    /// Returns [`CoreError::Configuration`] if `api_key` is empty.
    pub fn new(api_key: &str, model: &str, dimensions: usize) -> Result<Self, CoreError> {
        if api_key.is_empty() {
            return Err(CoreError::Configuration(
                "embedding API key is required".to_string(),
            ));
        }
        Ok(Self {
            client: openai::Client::new(api_key),
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingClient for RigEmbeddingClient {
    fn name(&self) -> &str {
        "rig-openai"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let model = self.client.embedding_model(&self.model);
        let docs = rig::embeddings::EmbeddingsBuilder::new(model)
            .documents(texts.to_vec())
            .map_err(|e| CoreError::transient("embedding_client", e.to_string()))?
            .build()
            .await
            .map_err(|e| CoreError::transient("embedding_client", e.to_string()))?;

        Ok(docs
            .into_iter()
            .map(|(_, embeddings)| {
                embeddings
                    .first()
                    .map(|e| e.vec.iter().map(|v| *v as f32).collect())
                    .unwrap_or_default()
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
