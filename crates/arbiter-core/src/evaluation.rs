//! Pass/fail policy and aggregate statistics for evaluations.
//!
//! The pass threshold is fixed. It is deliberately separate from the
//! human-feedback threshold in [`crate::notification`], which operators
//! configure.

use serde::{Deserialize, Serialize};

use crate::types::Evaluation;
use crate::ValidationError;

/// Scores at or above this value pass.
pub const PASS_THRESHOLD: f64 = 3.5;

/// Lowest score an evaluation can carry.
pub const MIN_SCORE: f64 = 1.0;

/// Highest score an evaluation can carry.
pub const MAX_SCORE: f64 = 5.0;

/// Whether a score passes.
pub fn passes(score: f64) -> bool {
    score >= PASS_THRESHOLD
}

/// Clamp a raw score into `[MIN_SCORE, MAX_SCORE]`.
pub fn clamp_score(raw: f64) -> f64 {
    MIN_SCORE.max(MAX_SCORE.min(raw))
}

/// Whether a value lies inside the score domain.
pub fn in_score_range(value: f64) -> bool {
    (MIN_SCORE..=MAX_SCORE).contains(&value)
}

/// Accept a score only if it lies inside the domain. Rejects NaN.
pub fn check_score(score: f64) -> Result<f64, ValidationError> {
    if in_score_range(score) {
        Ok(score)
    } else {
        Err(ValidationError::InvalidValue {
            field: "score".to_string(),
            reason: format!("{} is outside [{:.1}, {:.1}]", score, MIN_SCORE, MAX_SCORE),
        })
    }
}

/// Summary over a set of evaluations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStatistics {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Zero when there are no evaluations.
    pub average_score: f64,
    pub min_score: f64,
    pub max_score: f64,
}

impl EvaluationStatistics {
    pub fn from_evaluations<'a>(evaluations: impl IntoIterator<Item = &'a Evaluation>) -> Self {
        let scores: Vec<(f64, bool)> = evaluations
            .into_iter()
            .map(|e| (e.score(), e.pass()))
            .collect();

        if scores.is_empty() {
            return Self::default();
        }

        let total = scores.len();
        let passed = scores.iter().filter(|(_, pass)| *pass).count();
        let sum: f64 = scores.iter().map(|(s, _)| s).sum();
        let min_score = scores.iter().map(|(s, _)| *s).fold(f64::INFINITY, f64::min);
        let max_score = scores.iter().map(|(s, _)| *s).fold(f64::NEG_INFINITY, f64::max);

        Self {
            total,
            passed,
            failed: total - passed,
            average_score: sum / total as f64,
            min_score,
            max_score,
        }
    }

    /// Fraction of evaluations that passed, 0.0 when empty.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    #[test]
    fn test_threshold_boundary() {
        assert!(passes(3.5));
        assert!(!passes(3.4999));
        assert!(passes(5.0));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_score(7.5), 5.0);
        assert_eq!(clamp_score(0.2), 1.0);
        assert_eq!(clamp_score(2.75), 2.75);
    }

    #[test]
    fn test_statistics_empty() {
        let none: Vec<Evaluation> = Vec::new();
        let stats = EvaluationStatistics::from_evaluations(&none);
        assert_eq!(stats, EvaluationStatistics::default());
        assert_eq!(stats.pass_rate(), 0.0);
    }

    #[test]
    fn test_statistics() {
        let evaluations = vec![
            Evaluation::new(Uuid::new_v4(), "llm", 4.0, "a").unwrap(),
            Evaluation::new(Uuid::new_v4(), "llm", 2.0, "b").unwrap(),
            Evaluation::new(Uuid::new_v4(), "llm", 3.0, "c").unwrap(),
        ];
        let stats = EvaluationStatistics::from_evaluations(&evaluations);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.failed, 2);
        assert!((stats.average_score - 3.0).abs() < 1e-9);
        assert_eq!(stats.min_score, 2.0);
        assert_eq!(stats.max_score, 4.0);
    }

    proptest! {
        #[test]
        fn prop_pass_matches_threshold(score in 1.0f64..=5.0, revised in 1.0f64..=5.0) {
            let mut evaluation = Evaluation::new(Uuid::new_v4(), "llm", score, "x").unwrap();
            prop_assert_eq!(evaluation.pass(), score >= PASS_THRESHOLD);

            evaluation.revise(revised, "y").unwrap();
            prop_assert_eq!(evaluation.pass(), revised >= PASS_THRESHOLD);
        }

        #[test]
        fn prop_out_of_range_scores_rejected(score in prop_oneof![
            -1.0e6f64..0.999,
            5.001f64..1.0e6,
            Just(f64::NAN),
            Just(f64::INFINITY),
        ]) {
            prop_assert!(check_score(score).is_err());
            prop_assert!(Evaluation::new(Uuid::new_v4(), "llm", score, "x").is_err());
        }

        #[test]
        fn prop_clamp_stays_in_range(raw in -1.0e6f64..1.0e6) {
            let clamped = clamp_score(raw);
            prop_assert!(in_score_range(clamped));
        }
    }
}
