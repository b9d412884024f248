//! ABOUTME: The four-judge scoring table dispatched per question, per
//! ABOUTME: spec.md §4.I: Retrieval, Faithfulness, Quality, Tool. The first
//! ABOUTME: three fold their web/datetime/no-retrieval shortcuts before
//! ABOUTME: ever calling an LLM; Tool judges against the question's
//! ABOUTME: expected-tool annotation.

use ragcore_core::error::CoreError;
use ragcore_core::traits::llm::{CompletionParams, LlmClient};
use ragcore_core::types::{IntentTag, JudgeScore, JudgeScores};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// One question in an evaluation question set, with the optional
/// ground-truth annotation the Tool judge checks against.
#[derive(Debug, Clone)]
pub struct EvalQuestion {
    pub text: String,
    pub expected_tools: Vec<String>,
    pub expected_intent: Option<IntentTag>,
}

impl EvalQuestion {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expected_tools: Vec::new(),
            expected_intent: None,
        }
    }
}

const WEB_TOOLS: [&str; 2] = ["web_search", "fetch_webpage"];
const DATETIME_TOOL: &str = "get_current_datetime";

fn web_or_datetime_shortcut(tools_called: &[String]) -> Option<JudgeScore> {
    if tools_called.iter().any(|t| WEB_TOOLS.contains(&t.as_str())) {
        return Some(JudgeScore {
            score: 5,
            reason: "answered via web".to_string(),
        });
    }
    if tools_called.iter().any(|t| t == DATETIME_TOOL) {
        return Some(JudgeScore {
            score: 5,
            reason: "answered via datetime tool".to_string(),
        });
    }
    None
}

#[derive(Debug, Deserialize)]
struct RawScore {
    score: u8,
    reason: String,
}

fn clamp_score(raw: RawScore) -> JudgeScore {
    JudgeScore {
        score: raw.score.min(5),
        reason: raw.reason,
    }
}

async fn call_judge(llm: &Arc<dyn LlmClient>, model: &str, prompt: &str) -> Result<JudgeScore, CoreError> {
    let params = CompletionParams {
        model: model.to_string(),
        temperature: 0.0,
        max_tokens: 200,
    };
    let raw = llm.complete(prompt, &params).await?;
    let trimmed = raw.trim();
    let json_slice = trimmed
        .find('{')
        .and_then(|start| trimmed.rfind('}').map(|end| &trimmed[start..=end]))
        .unwrap_or(trimmed);
    let parsed: RawScore = serde_json::from_str(json_slice)
        .map_err(|err| CoreError::validation("eval_judge", format!("unparseable score: {err}")))?;
    Ok(clamp_score(parsed))
}

fn fallback_score(err: &CoreError) -> JudgeScore {
    warn!(error = %err, "judge call failed, scoring 0");
    JudgeScore {
        score: 0,
        reason: format!("judge unavailable: {err}"),
    }
}

/// Retrieval judge: question, retrieved text, tools called.
async fn judge_retrieval(
    llm: &Arc<dyn LlmClient>,
    model: &str,
    question: &str,
    retrieved_evidence: &str,
    tools_called: &[String],
) -> JudgeScore {
    if let Some(shortcut) = web_or_datetime_shortcut(tools_called) {
        return shortcut;
    }
    if retrieved_evidence.trim().is_empty() && tools_called.is_empty() {
        return JudgeScore {
            score: 0,
            reason: "no retrieval or tool used".to_string(),
        };
    }
    let prompt = format!(
        "Score 0-5 how well the retrieved evidence supports answering this question. \
         Respond with only {{\"score\": int, \"reason\": string}}.\n\n\
         Question: {question}\n\nRetrieved evidence:\n{retrieved_evidence}"
    );
    call_judge(llm, model, &prompt).await.unwrap_or_else(|err| fallback_score(&err))
}

/// Faithfulness judge: answer, retrieved text, tools called. Same
/// web/datetime shortcuts as Retrieval.
async fn judge_faithfulness(
    llm: &Arc<dyn LlmClient>,
    model: &str,
    answer: &str,
    retrieved_evidence: &str,
    tools_called: &[String],
) -> JudgeScore {
    if let Some(shortcut) = web_or_datetime_shortcut(tools_called) {
        return shortcut;
    }
    if retrieved_evidence.trim().is_empty() && tools_called.is_empty() {
        return JudgeScore {
            score: 0,
            reason: "no retrieval or tool used".to_string(),
        };
    }
    let prompt = format!(
        "Score 0-5 how faithfully the answer sticks to the retrieved evidence, with no \
         unsupported claims. Respond with only {{\"score\": int, \"reason\": string}}.\n\n\
         Retrieved evidence:\n{retrieved_evidence}\n\nAnswer:\n{answer}"
    );
    call_judge(llm, model, &prompt).await.unwrap_or_else(|err| fallback_score(&err))
}

/// Quality judge: question, answer. Weighs correctness, completeness,
/// clarity, relevance.
async fn judge_quality(llm: &Arc<dyn LlmClient>, model: &str, question: &str, answer: &str) -> JudgeScore {
    let prompt = format!(
        "Score 0-5 this answer's quality, weighing correctness, completeness, clarity, and \
         relevance to the question equally. Respond with only {{\"score\": int, \"reason\": string}}.\n\n\
         Question: {question}\n\nAnswer:\n{answer}"
    );
    call_judge(llm, model, &prompt).await.unwrap_or_else(|err| fallback_score(&err))
}

/// Tool judge: question, tools called, expected tools, expected intent. 0
/// if no tool was called when one was needed.
async fn judge_tool(
    llm: &Arc<dyn LlmClient>,
    model: &str,
    question: &EvalQuestion,
    tools_called: &[String],
) -> JudgeScore {
    if !question.expected_tools.is_empty() && tools_called.is_empty() {
        return JudgeScore {
            score: 0,
            reason: "no tool called when one was needed".to_string(),
        };
    }
    let expected = if question.expected_tools.is_empty() {
        "(none specified)".to_string()
    } else {
        question.expected_tools.join(", ")
    };
    let expected_intent = question
        .expected_intent
        .map_or_else(|| "(none specified)".to_string(), |i| format!("{i:?}"));
    let prompt = format!(
        "Score 0-5 how well the tools actually called match what this question needed. \
         Respond with only {{\"score\": int, \"reason\": string}}.\n\n\
         Question: {}\n\nTools called: {}\n\nExpected tools: {expected}\n\nExpected intent: {expected_intent}",
        question.text,
        if tools_called.is_empty() {
            "(none)".to_string()
        } else {
            tools_called.join(", ")
        },
    );
    call_judge(llm, model, &prompt).await.unwrap_or_else(|err| fallback_score(&err))
}

/// Dispatch all four judges in parallel for one question's result. Each
/// judge writes only to its own result slot, per spec.md §5's "must not
/// share mutable state except for their own result slots".
pub async fn run_all_judges(
    llm: &Arc<dyn LlmClient>,
    model: &str,
    question: &EvalQuestion,
    answer: &str,
    retrieved_evidence: &str,
    tools_called: &[String],
) -> JudgeScores {
    let (retrieval, faithfulness, quality, tool) = tokio::join!(
        judge_retrieval(llm, model, &question.text, retrieved_evidence, tools_called),
        judge_faithfulness(llm, model, answer, retrieved_evidence, tools_called),
        judge_quality(llm, model, &question.text, answer),
        judge_tool(llm, model, question, tools_called),
    );
    JudgeScores {
        retrieval,
        faithfulness,
        quality,
        tool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_providers::DeterministicLlmClient;

    fn llm_with_default(default: &str) -> Arc<dyn LlmClient> {
        Arc::new(DeterministicLlmClient::new(default))
    }

    #[tokio::test]
    async fn retrieval_shortcut_for_web_search() {
        let llm = llm_with_default("{}");
        let score = judge_retrieval(&llm, "judge", "q", "", &["web_search".to_string()]).await;
        assert_eq!(score.score, 5);
        assert_eq!(score.reason, "answered via web");
    }

    #[tokio::test]
    async fn retrieval_zero_when_nothing_used() {
        let llm = llm_with_default("{}");
        let score = judge_retrieval(&llm, "judge", "q", "   ", &[]).await;
        assert_eq!(score.score, 0);
    }

    #[tokio::test]
    async fn faithfulness_shortcut_for_datetime_tool() {
        let llm = llm_with_default("{}");
        let score = judge_faithfulness(&llm, "judge", "it's 3pm", "", &["get_current_datetime".to_string()]).await;
        assert_eq!(score.score, 5);
        assert_eq!(score.reason, "answered via datetime tool");
    }

    #[tokio::test]
    async fn quality_judge_parses_llm_score() {
        let llm = llm_with_default(r#"{"score": 4, "reason": "solid"}"#);
        let score = judge_quality(&llm, "judge", "q", "a").await;
        assert_eq!(score.score, 4);
        assert_eq!(score.reason, "solid");
    }

    #[tokio::test]
    async fn tool_judge_zero_when_expected_but_none_called() {
        let llm = llm_with_default("{}");
        let question = EvalQuestion {
            text: "what's in the doc".to_string(),
            expected_tools: vec!["search_knowledge".to_string()],
            expected_intent: None,
        };
        let score = judge_tool(&llm, "judge", &question, &[]).await;
        assert_eq!(score.score, 0);
    }

    #[tokio::test]
    async fn run_all_judges_fills_every_slot() {
        let llm = llm_with_default(r#"{"score": 3, "reason": "ok"}"#);
        let question = EvalQuestion::new("what time is it");
        let scores = run_all_judges(&llm, "judge", &question, "it is noon", "", &["get_current_datetime".to_string()]).await;
        assert_eq!(scores.retrieval.score, 5);
        assert_eq!(scores.faithfulness.score, 5);
        assert_eq!(scores.quality.score, 3);
    }
}
