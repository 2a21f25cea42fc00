//! Caption intent parsing.

use std::sync::LazyLock;

use regex::Regex;
use sticker_models::Intent;

static SQUARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:square|sqaure|1:1)\b").unwrap());
static REMOVE_BG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\brbg\b").unwrap());
static KEYWORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bsticker\b").unwrap());

/// Parse caption directives. Matching is whole-word and case-insensitive.
pub fn parse_intent(caption: &str, requires_keyword: bool) -> Intent {
    Intent {
        wants_square: SQUARE.is_match(caption),
        wants_background_removal: REMOVE_BG.is_match(caption),
        requires_keyword,
        has_keyword: KEYWORD.is_match(caption),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_variants() {
        for caption in ["square", "SQUARE please", "sqaure", "make it 1:1", "1:1"] {
            assert!(parse_intent(caption, false).wants_square, "{caption}");
        }
    }

    #[test]
    fn test_whole_word_only() {
        let intent = parse_intent("squares rbgx stickers 11:1", true);
        assert!(!intent.wants_square);
        assert!(!intent.wants_background_removal);
        assert!(!intent.has_keyword);
        assert!(!intent.passes_keyword_gate());
    }

    #[test]
    fn test_combined_flags() {
        let intent = parse_intent("Sticker, square + RBG!", true);
        assert!(intent.wants_square);
        assert!(intent.wants_background_removal);
        assert!(intent.has_keyword);
        assert!(intent.passes_keyword_gate());
    }

    #[test]
    fn test_empty_caption() {
        let intent = parse_intent("", false);
        assert!(!intent.wants_square && !intent.wants_background_removal && !intent.has_keyword);
        assert!(intent.passes_keyword_gate());
    }

    #[test]
    fn test_is_pure() {
        assert_eq!(parse_intent("square rbg", false), parse_intent("square rbg", false));
    }
}
