//! ABOUTME: Regex-heuristic fallback used when the LLM's intent JSON fails
//! ABOUTME: to parse: compiled patterns, early-exit hot path, no
//! ABOUTME: domain-specific extraction.

use ragcore_core::types::IntentTag;
use regex::Regex;
use std::sync::LazyLock;

/// Compiled intent patterns, checked in order; the first match wins.
/// Greeting is checked first since it is the cheapest and most common
/// short-circuit; `datetime` and `draw_diagram` next since they have the
/// most distinctive vocabulary; `document_summary` and `comparison` last
/// since their phrasing overlaps more with general knowledge queries.
static INTENT_PATTERNS: LazyLock<Vec<(Regex, IntentTag)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)^\s*(hi|hello|hey|good\s+(morning|afternoon|evening))\b").unwrap(),
            IntentTag::Greeting,
        ),
        (
            Regex::new(r"(?i)\b(what\s+(time|date)\s+is\s+it|current\s+(time|date)|what'?s\s+today'?s\s+date)\b")
                .unwrap(),
            IntentTag::Datetime,
        ),
        (
            Regex::new(r"(?i)\b(draw|diagram|flowchart|mermaid|visualiz\w*)\b").unwrap(),
            IntentTag::DrawDiagram,
        ),
        (
            Regex::new(r"(?i)^\s*(summarize|summarise|give\s+me\s+a\s+summary\s+of|tl;?dr)\b")
                .unwrap(),
            IntentTag::DocumentSummary,
        ),
        (
            Regex::new(r"(?i)\b(compare|versus|vs\.?|difference\s+between)\b").unwrap(),
            IntentTag::Comparison,
        ),
    ]
});

/// Short complaint/refinement phrases that, following a diagram turn,
/// trigger the dialogue-continuity override (spec.md §4.D).
static CONTINUATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\bredo\b").unwrap(),
        Regex::new(r"(?i)\bmore\s+detail").unwrap(),
        Regex::new(r"(?i)\btry\s+again\b").unwrap(),
        Regex::new(r"(?i)\bthat'?s\s+not\s+right\b").unwrap(),
        Regex::new(r"(?i)\bmake\s+it\s+(bigger|clearer|simpler)\b").unwrap(),
    ]
});

/// Classify `question` with the fallback pattern set, defaulting to
/// `knowledge_query` at confidence 0.5 per spec.md §4.D.
#[must_use]
pub fn classify(question: &str) -> (IntentTag, f32) {
    for (pattern, tag) in INTENT_PATTERNS.iter() {
        if pattern.is_match(question) {
            return (*tag, 0.7);
        }
    }
    (IntentTag::KnowledgeQuery, 0.5)
}

/// Whether `question` reads as a short complaint/refinement follow-up that
/// should inherit the previous turn's intent, per the dialogue-continuity
/// rule. Only meaningful when the previous assistant turn was a diagram.
#[must_use]
pub fn is_continuation_phrase(question: &str) -> bool {
    let word_count = question.split_whitespace().count();
    word_count <= 8 && CONTINUATION_PATTERNS.iter().any(|p| p.is_match(question))
}

/// Extract keywords from `question` by splitting on whitespace/punctuation
/// and dropping short tokens. No stopword list is carried in this crate;
/// the intent JSON path is expected to supply richer keywords when the LLM
/// call succeeds, and this is purely a regressive fallback.
#[must_use]
pub fn extract_keywords(question: &str) -> Vec<String> {
    question
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|tok| tok.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_greeting() {
        assert_eq!(classify("hello there").0, IntentTag::Greeting);
    }

    #[test]
    fn classifies_datetime() {
        assert_eq!(classify("what time is it right now").0, IntentTag::Datetime);
    }

    #[test]
    fn classifies_draw_diagram() {
        assert_eq!(classify("can you draw a flowchart of this process").0, IntentTag::DrawDiagram);
    }

    #[test]
    fn classifies_document_summary() {
        assert_eq!(classify("summarize the onboarding doc").0, IntentTag::DocumentSummary);
    }

    #[test]
    fn classifies_comparison() {
        assert_eq!(classify("what's the difference between A and B").0, IntentTag::Comparison);
    }

    #[test]
    fn defaults_to_knowledge_query() {
        let (tag, confidence) = classify("how does the retry controller decide to stop");
        assert_eq!(tag, IntentTag::KnowledgeQuery);
        assert!((confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn recognizes_continuation_phrases() {
        assert!(is_continuation_phrase("redo it"));
        assert!(is_continuation_phrase("can you add more detail please"));
        assert!(!is_continuation_phrase("what is the capital of France and why does it matter historically"));
    }
}
