//! Storage collaborator for the evaluation pipeline.
//!
//! The pipeline never locks in-process to serialize requests; races on the
//! same execution are resolved by the store's unique index on
//! `(platform, external_execution_id)`, reported as [`StorageError::Conflict`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use arbiter_core::{Evaluation, EvaluationRecord, HistoryQuery, ModelRun, WorkflowRun};

mod memory;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::InMemoryStore;

/// Errors from a storage backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Unique-key violation. Recoverable for workflow-run creation.
    #[error("unique violation: {0}")]
    Conflict(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Look up a run by its external identity.
    async fn find_workflow_run(
        &self,
        platform: &str,
        external_execution_id: &str,
    ) -> Result<Option<WorkflowRun>>;

    async fn get_workflow_run(&self, id: Uuid) -> Result<WorkflowRun>;

    /// Insert a run. Fails with `Conflict` if its external identity exists.
    async fn insert_workflow_run(&self, run: WorkflowRun) -> Result<WorkflowRun>;

    async fn update_workflow_run(&self, run: &WorkflowRun) -> Result<()>;

    /// Insert a model run. Its workflow run must exist.
    async fn insert_model_run(&self, run: ModelRun) -> Result<ModelRun>;

    async fn get_model_run(&self, id: Uuid) -> Result<ModelRun>;

    /// Insert an evaluation. Its model run must exist.
    async fn insert_evaluation(&self, evaluation: Evaluation) -> Result<Evaluation>;

    async fn get_evaluation(&self, id: Uuid) -> Result<Evaluation>;

    async fn update_evaluation(&self, evaluation: &Evaluation) -> Result<()>;

    /// Evaluations joined with their runs, filtered, newest first.
    async fn query_evaluations(&self, query: &HistoryQuery) -> Result<Vec<EvaluationRecord>>;
}
