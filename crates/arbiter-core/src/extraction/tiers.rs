//! The three extraction tiers.
//!
//! Each tier is a pure `text -> Option<(score, feedback)>` function and knows
//! nothing about the others; ordering lives in [`super::ScoreExtractor`].

use serde_json::Value;

use super::patterns::{
    context_window, mentions_score_keyword, parse_decimal, parse_number, CONTEXT_RADIUS,
    DEFAULT_FEEDBACK,
    LABELED_SCORE_PATTERNS, NUMBER_PATTERN,
};
use crate::evaluation::{clamp_score, in_score_range};

/// Read a `{"score": .., "feedback": ..}` object embedded anywhere in the text.
///
/// The span from the first `{` to the last `}` is parsed, which tolerates
/// prose or code fences around the payload. The score may be a number or a
/// plain decimal string (no exponent) and is clamped into range. Any other field, including a
/// grader-supplied `pass`, is ignored.
pub fn structured(raw: &str) -> Option<(f64, String)> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }

    let value: Value = serde_json::from_str(&raw[start..=end]).ok()?;
    let object = value.as_object()?;

    let score = match object.get("score")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }?;

    let feedback = match object.get("feedback") {
        None | Some(Value::Null) => DEFAULT_FEEDBACK.to_string(),
        Some(Value::String(s)) => s.clone(),
        // A non-text feedback field means the payload is not the shape we asked for.
        Some(_) => return None,
    };

    Some((clamp_score(score), feedback))
}

/// Match labelled phrases such as `rating: 4` or `3.5 out of 5`.
///
/// Only the first match of each pattern is considered; a match outside
/// `[1, 5]` moves on to the next pattern. Feedback is the whole text.
pub fn labeled(raw: &str) -> Option<(f64, String)> {
    LABELED_SCORE_PATTERNS.iter().find_map(|(name, regex)| {
        let caps = regex.captures(raw)?;
        let score = parse_number(caps.get(1)?.as_str())?;
        if in_score_range(score) {
            tracing::debug!(pattern = name, score, "Labelled score pattern matched");
            Some((score, raw.to_string()))
        } else {
            None
        }
    })
}

/// Take the first in-range number with a score keyword nearby.
pub fn contextual(raw: &str) -> Option<(f64, String)> {
    NUMBER_PATTERN.find_iter(raw).find_map(|m| {
        let value = parse_number(m.as_str())?;
        if !in_score_range(value) {
            return None;
        }

        let window = context_window(raw, m.start(), CONTEXT_RADIUS);
        if mentions_score_keyword(window) {
            Some((value, raw.to_string()))
        } else {
            None
        }
    })
}
