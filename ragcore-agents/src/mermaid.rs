//! ABOUTME: Mermaid diagram detection and tag normalization, shared by the
//! ABOUTME: ReAct trace parser, the generate_diagram tool, and the quality
//! ABOUTME: controller's pre-/post-check (spec.md §4.F, §4.H).

use regex::Regex;
use std::sync::LazyLock;

pub const OPEN_TAG: &str = "[MERMAID_DIAGRAM]";
pub const CLOSE_TAG: &str = "[/MERMAID_DIAGRAM]";

static BARE_DIAGRAM_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(flowchart\s+(TD|LR|TB|RL|BT)\b|sequenceDiagram\b)").unwrap()
});

/// Find a complete `[MERMAID_DIAGRAM]...[/MERMAID_DIAGRAM]` block anywhere
/// in `text` and return it untouched, tags included.
#[must_use]
pub fn find_tagged_block(text: &str) -> Option<String> {
    let start = text.find(OPEN_TAG)?;
    let rest = &text[start..];
    let end = rest.find(CLOSE_TAG)?;
    Some(rest[..end + CLOSE_TAG.len()].to_string())
}

/// Normalize `text`: if it already contains a well-formed tagged block,
/// return that block untouched. Otherwise, if it contains a bare
/// `flowchart ...` or `sequenceDiagram` block, wrap the rest of the text
/// (from that point to the end, or to a blank line) in the tags. Returns
/// `None` when no diagram content is found at all.
#[must_use]
pub fn normalize(text: &str) -> Option<String> {
    if let Some(block) = find_tagged_block(text) {
        return Some(block);
    }

    let start = BARE_DIAGRAM_START.find(text)?.start();
    let body = &text[start..];
    let end = body.find("\n\n").unwrap_or(body.len());
    let diagram_body = body[..end].trim();
    Some(format!("{OPEN_TAG}\n{diagram_body}\n{CLOSE_TAG}"))
}

/// Whether `text` contains a Mermaid diagram in either raw or tagged form.
#[must_use]
pub fn contains_diagram(text: &str) -> bool {
    find_tagged_block(text).is_some() || BARE_DIAGRAM_START.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_already_tagged_block() {
        let text = "here you go\n[MERMAID_DIAGRAM]\nflowchart TD\nA-->B\n[/MERMAID_DIAGRAM]\nthanks";
        let block = find_tagged_block(text).unwrap();
        assert!(block.starts_with(OPEN_TAG));
        assert!(block.ends_with(CLOSE_TAG));
    }

    #[test]
    fn wraps_bare_flowchart() {
        let text = "Sure, here's the diagram:\nflowchart TD\n  A --> B\n  B --> C\n\nLet me know if you need changes.";
        let normalized = normalize(text).unwrap();
        assert!(normalized.starts_with(OPEN_TAG));
        assert!(normalized.contains("flowchart TD"));
        assert!(normalized.ends_with(CLOSE_TAG));
    }

    #[test]
    fn wraps_bare_sequence_diagram() {
        let text = "sequenceDiagram\n  Alice->>Bob: Hello";
        let normalized = normalize(text).unwrap();
        assert!(normalized.contains("sequenceDiagram"));
    }

    #[test]
    fn returns_none_without_diagram_content() {
        assert!(normalize("just a plain text answer").is_none());
    }

    #[test]
    fn contains_diagram_detects_both_forms() {
        assert!(contains_diagram("[MERMAID_DIAGRAM]flowchart TD[/MERMAID_DIAGRAM]"));
        assert!(contains_diagram("flowchart LR\nA-->B"));
        assert!(!contains_diagram("no diagram here"));
    }
}
