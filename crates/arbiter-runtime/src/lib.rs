//! # arbiter-runtime
//!
//! The async half of arbiter: records workflow and model executions, asks a
//! grading model for a judgment, stores the resulting evaluation and escalates
//! poor results to human reviewers.
//!
//! Scoring itself is deterministic and lives in `arbiter-core`. This crate
//! owns everything with latency or side effects:
//!
//! - [`EvaluationOrchestrator`]: the per-request pipeline
//! - [`WorkflowRunRegistry`]: idempotent workflow-run resolution
//! - [`Grader`] / [`LlmGrader`]: grading model calls over an [`providers::LlmProvider`]
//! - [`NotificationGate`]: best-effort, background human-review alerts
//! - [`EvaluationStore`]: the storage seam, with [`InMemoryStore`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use arbiter_runtime::{EvaluationOrchestrator, FixedResponseGrader, InMemoryStore, RuntimeConfig};
//!
//! let orchestrator = EvaluationOrchestrator::builder()
//!     .store(Arc::new(InMemoryStore::new()))
//!     .grader(Arc::new(FixedResponseGrader::new(r#"{"score": 4, "feedback": "Solid"}"#)))
//!     .config(RuntimeConfig::default())
//!     .build()?;
//!
//! let outcome = orchestrator.evaluate(&request).await?;
//! println!("{} pass={}", outcome.response.score, outcome.response.pass);
//! ```

pub mod config;
pub mod grader;
pub mod history;
pub mod notify;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod recorders;
pub mod registry;
pub mod storage;

pub use config::{ConfigError, EmailConfig, GraderConfig, NotificationConfig, RuntimeConfig};
pub use grader::{FixedResponseGrader, Grader, GraderError, GradingInput, LlmGrader};
pub use history::HistoryService;
pub use notify::{
    ChannelAttempt, DeliveryReport, NotificationChannel, NotificationError, NotificationGate,
};
pub use orchestrator::{
    BuildError, EvaluationOrchestrator, EvaluationOrchestratorBuilder, PipelineError,
    PipelineOutcome, PipelineStage,
};
pub use recorders::{EvaluationRecorder, ModelRunRecorder, RecordError};
pub use registry::{Resolution, WorkflowRunRegistry};
pub use storage::{EvaluationStore, InMemoryStore, StorageError};
