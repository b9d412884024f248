//! ABOUTME: Sentence-boundary-aware truncation used by the context engine
//! ABOUTME: to keep each section within its sub-budget.

/// Truncate `text` to at most `max_chars` characters, preferring to cut at
/// the last sentence boundary (`.`, `?`, `!` followed by whitespace or
/// end-of-string) within the budget. Falls back to a hard character cut
/// when no sentence boundary exists within the budget.
#[must_use]
pub fn truncate_at_boundary(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }

    let window: String = chars[..max_chars].iter().collect();
    if let Some(cut) = last_sentence_boundary(&window) {
        if cut > 0 {
            return window[..cut].to_string();
        }
    }

    window
}

/// Byte index one past the last sentence-terminating punctuation in `s`, or
/// `None` if no boundary is found.
fn last_sentence_boundary(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut best: Option<usize> = None;
    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b'.' | b'?' | b'!') {
            let next_is_boundary = bytes
                .get(i + 1)
                .map_or(true, |c| c.is_ascii_whitespace());
            if next_is_boundary {
                best = Some(i + 1);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_short_text_untouched() {
        assert_eq!(truncate_at_boundary("hello", 100), "hello");
    }

    #[test]
    fn cuts_at_sentence_boundary() {
        let text = "First sentence. Second sentence. Third.";
        let out = truncate_at_boundary(text, 20);
        assert_eq!(out, "First sentence.");
    }

    #[test]
    fn falls_back_to_char_cut_without_boundary() {
        let text = "nopunctuationatallhere";
        let out = truncate_at_boundary(text, 10);
        assert_eq!(out, "nopunctuat");
    }
}
