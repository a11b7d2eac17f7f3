//! Token estimation.

/// Estimate the token cost of `text`.
///
/// Counts whitespace-delimited segments, a coarse proxy for a real
/// tokenizer. The budget ceilings are expressed in this unit.
///
/// The ASCII information separators U+001C..=U+001F also split segments,
/// alongside Unicode `White_Space`.
pub fn estimate_tokens(text: &str) -> usize {
    text.split(is_separator).filter(|s| !s.is_empty()).count()
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   \t\n "), 0);
    }

    #[test]
    fn test_counts_whitespace_segments() {
        assert_eq!(estimate_tokens("hello world"), 2);
        assert_eq!(estimate_tokens("  leading and   repeated\tspaces\n"), 4);
        assert_eq!(estimate_tokens("punctuation,stays.attached!"), 1);
    }

    #[test]
    fn test_unicode_text() {
        assert_eq!(estimate_tokens("نماز کے اوقات"), 3);
        // U+3000 ideographic space separates segments too.
        assert_eq!(estimate_tokens("a\u{3000}b"), 2);
    }

    #[test]
    fn test_information_separators_split_segments() {
        assert_eq!(estimate_tokens("a\u{1c}b"), 2);
        assert_eq!(estimate_tokens("a\u{1d}b\u{1e}c\u{1f}d"), 4);
        assert_eq!(estimate_tokens("\u{1f}\u{1c} x \u{1e}"), 1);
        // U+001B is not a separator.
        assert_eq!(estimate_tokens("a\u{1b}b"), 1);
    }

    #[test]
    fn test_deterministic() {
        let text = "the same input always costs the same";
        assert_eq!(estimate_tokens(text), estimate_tokens(text));
    }
}
