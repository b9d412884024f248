//! ABOUTME: Quality Evaluator and bounded Retry Controller (component H of
//! ABOUTME: spec.md §4.H): a single LLM judge pass over the produced
//! ABOUTME: answer, with a length-based fallback once retries are
//! ABOUTME: exhausted.

use crate::mermaid;
use ragcore_core::error::CoreError;
use ragcore_core::traits::llm::{CompletionParams, LlmClient};
use ragcore_core::types::IntentTag;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

/// The judge's verdict on one answer attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct QualityVerdict {
    pub pass: bool,
    pub reason: String,
}

fn judge_prompt(question: &str, context: &str, answer: &str, intent: IntentTag) -> String {
    let diagram_clause = if intent == IntentTag::DrawDiagram {
        "The question asked for a diagram, so the answer must contain a mermaid code block. "
    } else {
        ""
    };
    format!(
        "Judge whether this answer is acceptable. It must stay on topic, be substantive \
         (not a refusal or an empty hedge), and any step-by-step reasoning it contains must be \
         causally consistent with the retrieved context. {diagram_clause}\
         Respond with only a JSON object: {{\"pass\": bool, \"reason\": string}}.\n\n\
         Question: {question}\n\nRetrieved context:\n{context}\n\nAnswer:\n{answer}"
    )
}

fn retry_prompt(question: &str, context: &str, failure_reason: &str) -> String {
    format!(
        "Your previous answer failed review for this reason: {failure_reason}\n\
         Answer again using only the retrieved context already gathered below — do not call any \
         web search tool, the context already has everything you need.\n\n\
         Question: {question}\n\nRetrieved context:\n{context}\n\nAnswer:"
    )
}

/// Drives the bounded quality/retry pass over an already-produced answer,
/// per spec.md §4.H.
pub struct QualityController {
    llm: Arc<dyn LlmClient>,
    model: String,
    max_retries: u32,
    retry_timeout: Duration,
    length_fallback_min_chars: usize,
}

impl QualityController {
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        max_retries: u32,
        retry_timeout_secs: u64,
        length_fallback_min_chars: usize,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            max_retries,
            retry_timeout: Duration::from_secs(retry_timeout_secs),
            length_fallback_min_chars,
        }
    }

    /// Judge one answer. Diagram answers are normalized (tagged or bare
    /// mermaid block extracted) before judging, since the judge only ever
    /// sees prose plus an optional code block, never the raw ReAct trace.
    #[instrument(skip(self, context, answer))]
    pub async fn judge(&self, question: &str, context: &str, answer: &str, intent: IntentTag) -> QualityVerdict {
        let normalized = mermaid::normalize(answer).unwrap_or_else(|| answer.to_string());
        let prompt = judge_prompt(question, context, &normalized, intent);
        match self.run_judge(&prompt).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(error = %err, "quality judge call failed, treating as pass");
                QualityVerdict {
                    pass: true,
                    reason: format!("judge unavailable: {err}"),
                }
            }
        }
    }

    async fn run_judge(&self, prompt: &str) -> Result<QualityVerdict, CoreError> {
        let params = CompletionParams {
            model: self.model.clone(),
            temperature: 0.0,
            max_tokens: 256,
        };
        let raw = self.llm.complete(prompt, &params).await?;
        parse_verdict(&raw)
    }

    /// Ask the LLM to retry, bounded by `max_retries` attempts each capped
    /// at `retry_timeout`. Returns the first answer that passes judging, or
    /// the length-based fallback (longest candidate at least
    /// `length_fallback_min_chars` long, else the last candidate produced)
    /// once retries are exhausted.
    #[instrument(skip(self, context, initial_answer, regenerate))]
    pub async fn ensure_quality<F, Fut>(
        &self,
        question: &str,
        context: &str,
        intent: IntentTag,
        initial_answer: String,
        mut regenerate: F,
    ) -> String
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = String>,
    {
        let mut verdict = self.judge(question, context, &initial_answer, intent).await;
        let mut candidates = vec![initial_answer];

        let mut attempt = 0u32;
        while !verdict.pass && attempt < self.max_retries {
            attempt += 1;
            let retry_input = retry_prompt(question, context, &verdict.reason);
            let next = match tokio::time::timeout(self.retry_timeout, regenerate(retry_input)).await {
                Ok(answer) => answer,
                Err(_) => {
                    warn!(attempt, "retry generation timed out");
                    break;
                }
            };
            verdict = self.judge(question, context, &next, intent).await;
            candidates.push(next);
        }

        if verdict.pass {
            return candidates.pop().unwrap_or_default();
        }

        self.length_fallback(candidates)
    }

    fn length_fallback(&self, candidates: Vec<String>) -> String {
        candidates
            .iter()
            .filter(|c| c.len() >= self.length_fallback_min_chars)
            .max_by_key(|c| c.len())
            .cloned()
            .or_else(|| candidates.last().cloned())
            .unwrap_or_default()
    }
}

fn parse_verdict(raw: &str) -> Result<QualityVerdict, CoreError> {
    let trimmed = raw.trim();
    let json_slice = trimmed
        .find('{')
        .and_then(|start| trimmed.rfind('}').map(|end| &trimmed[start..=end]))
        .unwrap_or(trimmed);
    serde_json::from_str(json_slice)
        .map_err(|err| CoreError::validation("quality_judge", format!("unparseable verdict: {err}")))
}
