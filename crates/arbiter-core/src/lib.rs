//! # arbiter-core
//!
//! Deterministic evaluation logic for AI outputs produced inside workflow
//! automation platforms.
//!
//! This crate answers, without any I/O:
//! - Is this evaluation request well formed?
//! - What score did the grader give, whatever shape its answer took?
//! - Does that score pass, and does it need a human to look at it?
//!
//! ## Key Guarantees
//!
//! 1. **Extraction never fails**: any grader text yields a score in `[1.0, 5.0]`
//! 2. **Pass is derived**: `pass == (score >= 3.5)` for every [`Evaluation`]
//! 3. **Escalation is separate**: the human-feedback threshold is independent of pass
//!
//! ## Example
//!
//! ```rust
//! use arbiter_core::{extract_score, ExtractionTier};
//!
//! let result = extract_score("I rated 4.2 out of 5, concise and accurate.");
//! assert_eq!(result.score, 4.2);
//! assert_eq!(result.tier, ExtractionTier::Labeled);
//! ```

pub mod evaluation;
pub mod events;
pub mod extraction;
pub mod history;
pub mod notification;
pub mod request;
pub mod types;

pub use evaluation::{check_score, passes, EvaluationStatistics, PASS_THRESHOLD};
pub use events::PipelineEvent;
pub use extraction::{extract_score, ExtractedScore, ExtractionTier, ScoreExtractor};
pub use history::{EvaluationHistory, EvaluationRecord, HistoryQuery};
pub use notification::{NotificationPolicy, ReviewAlert, Severity};
pub use request::{EvaluateRequest, RequestError};
pub use types::{
    Evaluation, EvaluationResponse, ExecutionMode, ModelRun, NewModelRun, NewWorkflowRun,
    TaskType, WorkflowRun,
};

use thiserror::Error;

/// Input rejected before anything is persisted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Task type must be specified and cannot be Unknown")]
    UnknownTask,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
