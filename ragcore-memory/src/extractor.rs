//! ABOUTME: Pluggable memory extraction — an LLM-driven engine and a
//! ABOUTME: deterministic stub behind one trait, so callers can swap in a
//! ABOUTME: no-op extractor for tests without touching call sites.

use async_trait::async_trait;
use ragcore_core::error::CoreError;
use ragcore_core::traits::llm::{ChatMessage, ChatRole, CompletionParams, LlmClient};
use ragcore_core::types::{ExtractedMemory, MemoryKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// `extract(question, answer) -> [ExtractedMemory]`, spec.md §4.B.
#[async_trait]
pub trait MemoryExtractor: Send + Sync {
    async fn extract(&self, question: &str, answer: &str) -> Result<Vec<ExtractedMemory>, CoreError>;
}

/// Never extracts anything. Useful for tests and for KBs that opt out of
/// persistent memory entirely.
#[derive(Default)]
pub struct NoopMemoryExtractor;

#[async_trait]
impl MemoryExtractor for NoopMemoryExtractor {
    async fn extract(&self, _question: &str, _answer: &str) -> Result<Vec<ExtractedMemory>, CoreError> {
        Ok(Vec::new())
    }
}

/// Asks the LLM to return a strict JSON array of candidate memories and
/// parses it. A parse failure degrades to no memories rather than
/// propagating an error — a missed memory is an acceptable loss, unlike a
/// failed answer.
pub struct LlmMemoryExtractor {
    llm: Arc<dyn LlmClient>,
    model: String,
}

#[derive(serde::Deserialize)]
struct RawExtractedMemory {
    content: String,
    kind: String,
    importance: f32,
}

impl LlmMemoryExtractor {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    fn parse_kind(raw: &str) -> MemoryKind {
        match raw {
            "user_preference" => MemoryKind::UserPreference,
            "factual" => MemoryKind::Factual,
            "event" => MemoryKind::Event,
            _ => MemoryKind::General,
        }
    }
}

#[async_trait]
impl MemoryExtractor for LlmMemoryExtractor {
    async fn extract(&self, question: &str, answer: &str) -> Result<Vec<ExtractedMemory>, CoreError> {
        let prompt = format!(
            "Extract zero or more short declarative memories worth remembering from this \
             exchange. Respond with a strict JSON array, each element shaped \
             {{\"content\": string, \"kind\": \"user_preference\"|\"factual\"|\"event\"|\"general\", \
             \"importance\": number in [0,1]}}. Respond with [] if nothing is worth keeping.\n\n\
             Question: {question}\nAnswer: {answer}"
        );
        let params = CompletionParams {
            model: self.model.clone(),
            temperature: 0.0,
            max_tokens: 512,
        };
        let messages = [ChatMessage {
            role: ChatRole::User,
            content: prompt,
        }];
        let raw = self.llm.chat(&messages, None, &params).await?;

        match serde_json::from_str::<Vec<RawExtractedMemory>>(raw.trim()) {
            Ok(parsed) => Ok(parsed
                .into_iter()
                .map(|m| ExtractedMemory {
                    content: m.content,
                    kind: Self::parse_kind(&m.kind),
                    importance: m.importance.clamp(0.0, 1.0),
                })
                .collect()),
            Err(err) => {
                warn!(error = %err, "failed to parse extraction output as JSON, skipping");
                debug!(raw, "raw extraction output");
                Ok(Vec::new())
            }
        }
    }
}

/// Cheap pre-filter deciding whether `extract` is worth an LLM call at all
/// (spec.md §4.B): greetings, single-sentence exchanges, and "I don't know"
/// answers are skipped.
#[must_use]
pub fn should_extract(question: &str, answer: &str) -> bool {
    let trimmed_answer = answer.trim();
    if trimmed_answer.is_empty() {
        return false;
    }

    let lower_answer = trimmed_answer.to_lowercase();
    if lower_answer.contains("i don't know") || lower_answer.contains("i do not know") {
        return false;
    }

    if is_greeting(question) {
        return false;
    }

    if is_single_sentence(question) && is_single_sentence(trimmed_answer) && trimmed_answer.len() < 40 {
        return false;
    }

    true
}

fn is_greeting(question: &str) -> bool {
    let lower = question.trim().to_lowercase();
    matches!(
        lower.as_str(),
        "hi" | "hello" | "hey" | "hi there" | "good morning" | "good afternoon" | "good evening"
    )
}

fn is_single_sentence(text: &str) -> bool {
    text.matches(['.', '?', '!']).count() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_greetings() {
        assert!(!should_extract("hello", "Hi! How can I help you today?"));
    }

    #[test]
    fn skips_i_dont_know_answers() {
        assert!(!should_extract(
            "What is the capital of Freedonia?",
            "I don't know the answer to that."
        ));
    }

    #[test]
    fn skips_trivial_single_sentence_exchanges() {
        assert!(!should_extract("ok?", "Yes."));
    }

    #[test]
    fn extracts_substantive_exchanges() {
        assert!(should_extract(
            "What's my favorite programming language?",
            "You mentioned earlier that you prefer Rust for systems work because of its safety guarantees and performance."
        ));
    }
}
