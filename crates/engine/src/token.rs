//! Token estimation.
//!
//! Uses a character-based heuristic: ~4 characters per token, which is close
//! enough for BPE tokenizers on English text to report layer sizes.

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(estimate_tokens("提示词工程"), 2);
    }
}
