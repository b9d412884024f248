//! ABOUTME: Conservative char-to-token estimation, kept constant within a
//! ABOUTME: release per the context engine's token-budget contract.

/// Default characters-per-token ratio. Conservative for CJK-mixed text;
/// implementations must document and keep this constant within a release
/// (spec.md §4.C).
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.0;

/// Estimate the token count of `text` using `chars_per_token`.
#[must_use]
pub fn estimate_tokens(text: &str, chars_per_token: f64) -> usize {
    let chars = text.chars().count() as f64;
    (chars / chars_per_token).ceil() as usize
}

/// Estimate the character budget corresponding to `max_tokens`.
#[must_use]
pub fn char_budget(max_tokens: usize, chars_per_token: f64) -> usize {
    (max_tokens as f64 * chars_per_token).floor() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_matches_ratio() {
        let text = "a".repeat(30);
        assert_eq!(estimate_tokens(&text, DEFAULT_CHARS_PER_TOKEN), 10);
    }

    #[test]
    fn char_budget_is_inverse_of_estimate() {
        let budget = char_budget(100, DEFAULT_CHARS_PER_TOKEN);
        assert_eq!(budget, 300);
    }
}
