//! ABOUTME: Enriched-message assembly for the ReAct loop, per spec.md §4.F:
//! ABOUTME: `## Retrieval Context`, optional `## Intent Hints`, `## Question`,
//! ABOUTME: and the diagram pre-tool reminder.

use ragcore_core::types::{Intent, IntentTag};

const DIAGRAM_REMINDER: &str = "Before calling generate_diagram you must first call deep_search \
     or summarize_topic to ground the diagram in the knowledge base — do not invent structure.";

/// Build the query string handed to the ReAct loop's first user turn.
#[must_use]
pub fn build_enriched_message(retrieval_context: &str, intent: Option<&Intent>, question: &str) -> String {
    let mut message = String::new();

    message.push_str("## Retrieval Context\n");
    if retrieval_context.trim().is_empty() {
        message.push_str("(no retrieval context available)");
    } else {
        message.push_str(retrieval_context.trim());
    }
    message.push_str("\n\n");

    if let Some(intent) = intent {
        if let Some(tool) = &intent.suggested_tool {
            message.push_str("## Intent Hints\n");
            message.push_str(&format!(
                "Classified intent: {:?}. Suggested tool: {tool}.\n\n",
                intent.intent
            ));
        }
    }

    message.push_str("## Question\n");
    message.push_str(question.trim());

    if intent.is_some_and(|i| i.intent == IntentTag::DrawDiagram) {
        message.push_str("\n\n");
        message.push_str(DIAGRAM_REMINDER);
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_retrieval_context_and_question() {
        let message = build_enriched_message("some facts", None, "what is RRF?");
        assert!(message.contains("## Retrieval Context"));
        assert!(message.contains("some facts"));
        assert!(message.contains("## Question"));
        assert!(message.contains("what is RRF?"));
        assert!(!message.contains("## Intent Hints"));
    }

    #[test]
    fn empty_retrieval_context_is_annotated() {
        let message = build_enriched_message("", None, "hi");
        assert!(message.contains("no retrieval context available"));
    }

    #[test]
    fn includes_intent_hints_when_suggested_tool_present() {
        let intent = Intent::new(
            IntentTag::Datetime,
            false,
            false,
            Vec::new(),
            Some("get_current_datetime".to_string()),
            0.9,
        );
        let message = build_enriched_message("", Some(&intent), "what time is it");
        assert!(message.contains("## Intent Hints"));
        assert!(message.contains("get_current_datetime"));
    }

    #[test]
    fn diagram_intent_appends_mandatory_reminder() {
        let intent = Intent::new(IntentTag::DrawDiagram, true, false, Vec::new(), None, 0.8);
        let message = build_enriched_message("", Some(&intent), "draw the pipeline");
        assert!(message.contains(DIAGRAM_REMINDER));
    }

    #[test]
    fn non_diagram_intent_omits_reminder() {
        let intent = Intent::new(IntentTag::KnowledgeQuery, true, true, Vec::new(), None, 0.8);
        let message = build_enriched_message("", Some(&intent), "what is rust");
        assert!(!message.contains(DIAGRAM_REMINDER));
    }
}
