//! ABOUTME: Lightweight named-entity detection for the adaptive context
//! ABOUTME: manager's "new entity appeared in an observation" trigger.

use std::collections::HashSet;

/// Extract capitalized multi-word-looking tokens (`CamelCase` or
/// Title-cased words) from `text` as a cheap proxy for named entities. This
/// is intentionally not a full NER pass — the adaptive context manager only
/// needs to detect *novelty*, not classify the entity.
#[must_use]
pub fn extract_candidate_entities(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| {
            w.len() > 2
                && w.chars()
                    .next()
                    .is_some_and(|c| c.is_uppercase())
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_capitalized_words() {
        let out = extract_candidate_entities("The Reciprocal Rank Fusion algorithm is neat");
        assert!(out.contains("Reciprocal"));
        assert!(out.contains("Rank"));
        assert!(out.contains("Fusion"));
        assert!(!out.contains("is"));
    }
}
