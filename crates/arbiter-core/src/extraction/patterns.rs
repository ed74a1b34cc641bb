//! Shared patterns for reading scores out of grader text.
//!
//! Patterns are compiled once and reused by the extraction tiers. The label
//! list is ordered: earlier patterns take precedence over later ones.

use lazy_static::lazy_static;
use regex::Regex;

/// Feedback used when a structured payload carries no `feedback` field.
pub const DEFAULT_FEEDBACK: &str = "No feedback provided";

/// Characters inspected on each side of a bare number in the contextual tier.
pub const CONTEXT_RADIUS: usize = 50;

/// Words that mark a nearby number as a score.
pub const SCORE_KEYWORDS: [&str; 6] = ["score", "rating", "grade", "evaluation", "quality", "level"];

lazy_static! {
    /// Labelled score patterns, tried in order. Group 1 captures the number.
    pub static ref LABELED_SCORE_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("score label", Regex::new(r#"(?i)score[":\s]*([0-9]+\.?[0-9]*)"#).unwrap()),
        ("rating label", Regex::new(r#"(?i)rating[":\s]*([0-9]+\.?[0-9]*)"#).unwrap()),
        ("grade label", Regex::new(r#"(?i)grade[":\s]*([0-9]+\.?[0-9]*)"#).unwrap()),
        ("evaluation label", Regex::new(r#"(?i)evaluation[":\s]*([0-9]+\.?[0-9]*)"#).unwrap()),
        ("out of five", Regex::new(r"(?i)([0-9]+\.?[0-9]*)\s*out\s*of\s*5").unwrap()),
        ("score is", Regex::new(r"(?i)score\s*is\s*([0-9]+\.?[0-9]*)").unwrap()),
        ("rated out of five", Regex::new(r"(?i)rated\s*([0-9]+\.?[0-9]*)\s*out\s*of\s*5").unwrap()),
    ];

    /// Any unsigned decimal token.
    pub static ref NUMBER_PATTERN: Regex = Regex::new(r"[0-9]+\.?[0-9]*").unwrap();

    /// A whole string holding a plain signed decimal. No exponent, no `NaN`.
    static ref DECIMAL_STRING: Regex = Regex::new(r"^\s*[+-]?[0-9]+\.?[0-9]*\s*$").unwrap();
}

/// Parse a numeric token, rejecting NaN and infinities.
pub fn parse_number(token: &str) -> Option<f64> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Whether the text contains any score keyword, ignoring case.
pub fn mentions_score_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    SCORE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// The slice of `text` spanning `radius` characters either side of byte
/// offset `at`. `at` must lie on a char boundary.
pub fn context_window(text: &str, at: usize, radius: usize) -> &str {
    if radius == 0 {
        return "";
    }

    let start = text[..at]
        .char_indices()
        .rev()
        .nth(radius - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = text[at..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| at + i)
        .unwrap_or(text.len());

    &text[start..end]
}

/// Parse a string-typed score. Only plain decimals are accepted, so `"1e2"`
/// or `"0x4"` are not numbers here.
pub fn parse_decimal(text: &str) -> Option<f64> {
    if DECIMAL_STRING.is_match(text) {
        parse_number(text)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_patterns_capture_numbers() {
        let (_, score) = &LABELED_SCORE_PATTERNS[0];
        let caps = score.captures(r#"{"Score": 4.5}"#).unwrap();
        assert_eq!(&caps[1], "4.5");

        let (_, out_of) = &LABELED_SCORE_PATTERNS[4];
        let caps = out_of.captures("I'd give it 3 OUT OF 5").unwrap();
        assert_eq!(&caps[1], "3");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("4.2"), Some(4.2));
        assert_eq!(parse_number(" 3 "), Some(3.0));
        assert_eq!(parse_number("4."), Some(4.0));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("four"), None);
    }

    #[test]
    fn test_parse_decimal_rejects_exponents() {
        assert_eq!(parse_decimal("4.5"), Some(4.5));
        assert_eq!(parse_decimal(" -2 "), Some(-2.0));
        assert_eq!(parse_decimal("+3."), Some(3.0));
        assert_eq!(parse_decimal("1e2"), None);
        assert_eq!(parse_decimal("4.5E0"), None);
        assert_eq!(parse_decimal(".5"), None);
        assert_eq!(parse_decimal("4 stars"), None);
    }

    #[test]
    fn test_keyword_detection() {
        assert!(mentions_score_keyword("Overall QUALITY is fine"));
        assert!(!mentions_score_keyword("The answer was 4"));
    }

    #[test]
    fn test_context_window_ascii() {
        let text = "abcdefghij";
        assert_eq!(context_window(text, 5, 2), "defg");
        assert_eq!(context_window(text, 1, 3), "abcd");
        assert_eq!(context_window(text, 9, 3), "ghij");
    }

    #[test]
    fn test_context_window_multibyte() {
        let text = "ééé4ééé";
        let at = text.find('4').unwrap();
        assert_eq!(context_window(text, at, 2), "éé4é");
    }
}
