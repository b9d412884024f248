//! ABOUTME: Deterministic LLM/embedding doubles used by property tests that
//! ABOUTME: require re-running the same input to produce the same output
//! ABOUTME: (e.g. re-running an evaluation with a deterministic LLM stub).

use async_trait::async_trait;
use ragcore_core::error::CoreError;
use ragcore_core::traits::{ChatMessage, CompletionParams, EmbeddingClient, LlmClient};
use std::collections::HashMap;
use std::sync::RwLock;

/// A deterministic LLM stub: looks up a canned response by exact prompt (or
/// the last user message for `chat`), falling back to a default response.
/// Used by evaluator idempotence tests and by unit tests that exercise the
/// intent analyzer's JSON-parsing path without a live model.
pub struct DeterministicLlmClient {
    responses: RwLock<HashMap<String, String>>,
    default_response: String,
}

impl DeterministicLlmClient {
    #[must_use]
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            default_response: default_response.into(),
        }
    }

    pub fn with_response(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl LlmClient for DeterministicLlmClient {
    async fn complete(&self, prompt: &str, _params: &CompletionParams) -> Result<String, CoreError> {
        Ok(self
            .responses
            .read()
            .unwrap()
            .get(prompt)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone()))
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        _tool_catalog: Option<&str>,
        _params: &CompletionParams,
    ) -> Result<String, CoreError> {
        let key = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(self
            .responses
            .read()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone()))
    }
}

/// A deterministic embedding stub: hashes each text into a fixed-size
/// vector so equal inputs always produce equal embeddings, without pulling
/// in a real model.
pub struct DeterministicEmbeddingClient {
    dimensions: usize,
}

impl DeterministicEmbeddingClient {
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingClient for DeterministicEmbeddingClient {
    fn name(&self) -> &str {
        "deterministic-test-double"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        Ok(texts.iter().map(|t| hash_to_vector(t, self.dimensions)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn hash_to_vector(text: &str, dimensions: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut out = Vec::with_capacity(dimensions);
    for i in 0..dimensions {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        i.hash(&mut hasher);
        let h = hasher.finish();
        out.push((h % 1000) as f32 / 1000.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_input_yields_same_embedding() {
        let client = DeterministicEmbeddingClient::new(8);
        let a = client.embed(&["hello".to_string()]).await.unwrap();
        let b = client.embed(&["hello".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn canned_response_is_returned_for_known_prompt() {
        let client = DeterministicLlmClient::new("default").with_response("ping", "pong");
        let out = client
            .complete("ping", &CompletionParams::default())
            .await
            .unwrap();
        assert_eq!(out, "pong");
    }
}
