//! Score extraction from free-form grader text.
//!
//! Graders are asked for JSON but routinely answer with commentary, fenced
//! blocks or plain prose. Extraction runs an ordered chain of tiers and the
//! first one that yields a usable score wins:
//!
//! | Tier | Source | Feedback |
//! |------|--------|----------|
//! | Structured | `{"score": .., "feedback": ..}` object | the object's `feedback` |
//! | Labeled | `rating: 4`, `3 out of 5`, ... | the whole text |
//! | Contextual | first in-range number near a score keyword | the whole text |
//!
//! Extraction never fails. An empty response scores 1.0; text that no tier
//! understands scores a neutral 3.0.

mod patterns;
mod tiers;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use patterns::{CONTEXT_RADIUS, DEFAULT_FEEDBACK, SCORE_KEYWORDS};
pub use tiers::{contextual, labeled, structured};

/// Score assigned when the grader returned nothing, or could not be reached.
pub const EMPTY_RESPONSE_SCORE: f64 = 1.0;

/// Score assigned when text was present but unreadable.
pub const UNPARSED_SCORE: f64 = 3.0;

/// Signature shared by every extraction tier.
pub type TierFn = fn(&str) -> Option<(f64, String)>;

/// Which path produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    Structured,
    Labeled,
    Contextual,
    /// Text present, no tier matched.
    Unparsed,
    /// Grader returned an empty string.
    EmptyResponse,
    /// Grader call failed or timed out.
    GraderFailure,
}

impl ExtractionTier {
    /// Whether the score came from the grader's own judgment.
    pub fn is_parsed(&self) -> bool {
        matches!(
            self,
            ExtractionTier::Structured | ExtractionTier::Labeled | ExtractionTier::Contextual
        )
    }
}

impl fmt::Display for ExtractionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionTier::Structured => "structured",
            ExtractionTier::Labeled => "labeled",
            ExtractionTier::Contextual => "contextual",
            ExtractionTier::Unparsed => "unparsed",
            ExtractionTier::EmptyResponse => "empty_response",
            ExtractionTier::GraderFailure => "grader_failure",
        };
        f.write_str(name)
    }
}

/// A score in `[1.0, 5.0]` with its feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedScore {
    pub score: f64,
    pub feedback: String,
    pub tier: ExtractionTier,
}

/// Ordered chain of extraction tiers.
pub struct ScoreExtractor {
    tiers: Vec<(ExtractionTier, TierFn)>,
}

impl ScoreExtractor {
    pub fn new() -> Self {
        Self {
            tiers: vec![
                (ExtractionTier::Structured, structured as TierFn),
                (ExtractionTier::Labeled, labeled as TierFn),
                (ExtractionTier::Contextual, contextual as TierFn),
            ],
        }
    }

    /// Turn raw grader text into a score.
    pub fn extract(&self, raw: &str) -> ExtractedScore {
        if raw.is_empty() {
            tracing::warn!("Grader returned an empty response");
            return ExtractedScore {
                score: EMPTY_RESPONSE_SCORE,
                feedback: "Evaluation failed: empty response from grader".to_string(),
                tier: ExtractionTier::EmptyResponse,
            };
        }

        tracing::debug!(response = raw, "Parsing grader response");

        for (tier, extract) in &self.tiers {
            match extract(raw) {
                Some((score, feedback)) => {
                    tracing::debug!(tier = %tier, score, "Score extracted");
                    return ExtractedScore {
                        score,
                        feedback,
                        tier: *tier,
                    };
                }
                None => tracing::debug!(tier = %tier, "Extraction tier found no score"),
            }
        }

        tracing::warn!("No extraction tier could read the grader response");
        ExtractedScore {
            score: UNPARSED_SCORE,
            feedback: format!("Failed to parse evaluation response: {}", raw),
            tier: ExtractionTier::Unparsed,
        }
    }

    /// Degraded result for a grader call that failed before returning text.
    pub fn grader_failure(&self, reason: impl fmt::Display) -> ExtractedScore {
        ExtractedScore {
            score: EMPTY_RESPONSE_SCORE,
            feedback: format!("Evaluation failed: {}", reason),
            tier: ExtractionTier::GraderFailure,
        }
    }

    /// The tiers in the order they are tried.
    pub fn tiers(&self) -> impl Iterator<Item = ExtractionTier> + '_ {
        self.tiers.iter().map(|(tier, _)| *tier)
    }
}

impl Default for ScoreExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract with the default tier chain.
pub fn extract_score(raw: &str) -> ExtractedScore {
    ScoreExtractor::new().extract(raw)
}
