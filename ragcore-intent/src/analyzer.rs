//! ABOUTME: The Intent Analyzer — one LLM call producing strict JSON intent
//! ABOUTME: classification, falling back to regex heuristics on parse
//! ABOUTME: failure, per spec.md §4.D.

use crate::regex_fallback::{classify, extract_keywords, is_continuation_phrase};
use ragcore_core::error::CoreError;
use ragcore_core::traits::llm::{ChatMessage, ChatRole, CompletionParams, LlmClient};
use ragcore_core::types::{Intent, IntentTag};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = r#"You classify a user's query into exactly one intent tag from this closed set: greeting, small_talk, document_summary, knowledge_query, comparison, draw_diagram, web_search, datetime, instruction.

Respond with strict JSON only, no prose, matching this shape:
{"intent": "<tag>", "needsKnowledgeBase": bool, "needsMemory": bool, "keywords": [string], "suggestedTool": string|null, "confidence": number between 0 and 1}

Dialogue continuity rule: if the previous assistant turn produced a diagram and the current question is a short complaint or refinement ("redo", "more detail", "try again"), classify it as draw_diagram and inherit the prior intent's semantics rather than treating it as a fresh request."#;

#[derive(Debug, Deserialize)]
struct RawIntent {
    intent: String,
    #[serde(rename = "needsKnowledgeBase")]
    needs_knowledge_base: bool,
    #[serde(rename = "needsMemory")]
    needs_memory: bool,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(rename = "suggestedTool", default)]
    suggested_tool: Option<String>,
    confidence: f32,
}

fn parse_tag(raw: &str) -> Option<IntentTag> {
    match raw {
        "greeting" => Some(IntentTag::Greeting),
        "small_talk" => Some(IntentTag::SmallTalk),
        "document_summary" => Some(IntentTag::DocumentSummary),
        "knowledge_query" => Some(IntentTag::KnowledgeQuery),
        "comparison" => Some(IntentTag::Comparison),
        "draw_diagram" => Some(IntentTag::DrawDiagram),
        "web_search" => Some(IntentTag::WebSearch),
        "datetime" => Some(IntentTag::Datetime),
        "instruction" => Some(IntentTag::Instruction),
        _ => None,
    }
}

pub struct IntentAnalyzer {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl IntentAnalyzer {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// `analyze(question, chat_history) -> Intent`. `previous_intent` names
    /// the intent tag of the previous assistant turn, used only to decide
    /// whether the dialogue-continuity override applies; pass `None` for
    /// the first turn of a session.
    pub async fn analyze(
        &self,
        question: &str,
        chat_history: &[ChatMessage],
        previous_intent: Option<IntentTag>,
    ) -> Result<Intent, CoreError> {
        let mut intent = match self.analyze_via_llm(question, chat_history).await {
            Ok(intent) => intent,
            Err(err) => {
                warn!(error = %err, "intent JSON parse failed, falling back to regex heuristics");
                self.analyze_via_regex(question)
            }
        };

        if previous_intent == Some(IntentTag::DrawDiagram) && is_continuation_phrase(question) {
            debug!("dialogue-continuity override: inheriting draw_diagram intent");
            intent = Intent::new(
                IntentTag::DrawDiagram,
                intent.needs_knowledge_base,
                intent.needs_memory,
                intent.keywords,
                Some("generate_diagram".to_string()),
                intent.confidence.max(0.7),
            );
        }

        Ok(intent)
    }

    async fn analyze_via_llm(
        &self,
        question: &str,
        chat_history: &[ChatMessage],
    ) -> Result<Intent, CoreError> {
        let mut messages = Vec::with_capacity(chat_history.len() + 2);
        messages.push(ChatMessage {
            role: ChatRole::System,
            content: SYSTEM_PROMPT.to_string(),
        });
        messages.extend(chat_history.iter().cloned());
        messages.push(ChatMessage {
            role: ChatRole::User,
            content: question.to_string(),
        });

        let params = CompletionParams {
            model: self.model.clone(),
            temperature: 0.0,
            max_tokens: 256,
        };
        let raw = self.llm.chat(&messages, None, &params).await?;

        let parsed: RawIntent = serde_json::from_str(raw.trim())
            .map_err(|e| CoreError::validation("intent_analyzer", format!("JSON parse failed: {e}")))?;
        let tag = parse_tag(&parsed.intent)
            .ok_or_else(|| CoreError::validation("intent_analyzer", format!("unknown intent tag: {}", parsed.intent)))?;

        Ok(Intent::new(
            tag,
            parsed.needs_knowledge_base,
            parsed.needs_memory,
            parsed.keywords,
            parsed.suggested_tool,
            parsed.confidence,
        ))
    }

    fn analyze_via_regex(&self, question: &str) -> Intent {
        let (tag, confidence) = classify(question);
        let keywords = extract_keywords(question);
        let suggested_tool = match tag {
            IntentTag::DrawDiagram => Some("generate_diagram".to_string()),
            IntentTag::Datetime => Some("get_current_datetime".to_string()),
            IntentTag::DocumentSummary => Some("summarize_topic".to_string()),
            IntentTag::WebSearch => Some("web_search".to_string()),
            _ => None,
        };
        Intent::new(
            tag,
            !tag.implies_no_kb(),
            tag != IntentTag::Greeting,
            keywords,
            suggested_tool,
            confidence,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubLlm {
        responses: Mutex<Vec<String>>,
    }

    impl StubLlm {
        fn returning(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(str::to_string).collect()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn complete(&self, _prompt: &str, _params: &CompletionParams) -> Result<String, CoreError> {
            Ok(self.responses.lock().unwrap().pop().unwrap_or_default())
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _tool_catalog: Option<&str>,
            _params: &CompletionParams,
        ) -> Result<String, CoreError> {
            Ok(self.responses.lock().unwrap().pop().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn parses_well_formed_json() {
        let llm = Arc::new(StubLlm::returning(vec![
            r#"{"intent":"knowledge_query","needsKnowledgeBase":true,"needsMemory":true,"keywords":["rust"],"suggestedTool":null,"confidence":0.9}"#,
        ]));
        let analyzer = IntentAnalyzer::new(llm, "test-model");
        let intent = analyzer.analyze("what is rust's ownership model", &[], None).await.unwrap();
        assert_eq!(intent.intent, IntentTag::KnowledgeQuery);
        assert!(intent.needs_knowledge_base);
        assert!((intent.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn falls_back_to_regex_on_malformed_json() {
        let llm = Arc::new(StubLlm::returning(vec!["not json at all"]));
        let analyzer = IntentAnalyzer::new(llm, "test-model");
        let intent = analyzer.analyze("hello there", &[], None).await.unwrap();
        assert_eq!(intent.intent, IntentTag::Greeting);
    }

    #[tokio::test]
    async fn dialogue_continuity_overrides_after_diagram_turn() {
        let llm = Arc::new(StubLlm::returning(vec![
            r#"{"intent":"knowledge_query","needsKnowledgeBase":true,"needsMemory":false,"keywords":[],"suggestedTool":null,"confidence":0.6}"#,
        ]));
        let analyzer = IntentAnalyzer::new(llm, "test-model");
        let intent = analyzer
            .analyze("redo it", &[], Some(IntentTag::DrawDiagram))
            .await
            .unwrap();
        assert_eq!(intent.intent, IntentTag::DrawDiagram);
        assert_eq!(intent.suggested_tool.as_deref(), Some("generate_diagram"));
    }

    #[tokio::test]
    async fn no_continuity_override_without_prior_diagram() {
        let llm = Arc::new(StubLlm::returning(vec!["garbage"]));
        let analyzer = IntentAnalyzer::new(llm, "test-model");
        let intent = analyzer.analyze("redo it", &[], None).await.unwrap();
        assert_ne!(intent.intent, IntentTag::DrawDiagram);
    }

    #[test]
    fn should_skip_agent_true_only_for_greeting_and_small_talk() {
        let greeting = Intent::new(IntentTag::Greeting, false, false, Vec::new(), None, 0.9);
        let small_talk = Intent::new(IntentTag::SmallTalk, false, false, Vec::new(), None, 0.9);
        let query = Intent::new(IntentTag::KnowledgeQuery, true, true, Vec::new(), None, 0.9);
        assert!(greeting.should_skip_agent());
        assert!(small_talk.should_skip_agent());
        assert!(!query.should_skip_agent());
    }
}
