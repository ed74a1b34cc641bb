//! Model-run and evaluation recording.

use std::sync::Arc;
use uuid::Uuid;

use arbiter_core::{Evaluation, ModelRun, NewModelRun, ValidationError};
use thiserror::Error;

use crate::storage::{EvaluationStore, StorageError};

#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Records one model invocation per call. Never deduplicates.
pub struct ModelRunRecorder {
    store: Arc<dyn EvaluationStore>,
}

impl ModelRunRecorder {
    pub fn new(store: Arc<dyn EvaluationStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, new: NewModelRun) -> Result<ModelRun, RecordError> {
        let run = ModelRun::new(new)?;
        let run = self.store.insert_model_run(run).await?;
        tracing::info!(
            model_run_id = %run.id,
            workflow_run_id = %run.workflow_run_id,
            task = %run.task,
            "Recorded model run"
        );
        Ok(run)
    }
}

/// Persists evaluations. `pass` is always derived from the score and scores
/// outside `[1.0, 5.0]` are refused before the store is touched.
pub struct EvaluationRecorder {
    store: Arc<dyn EvaluationStore>,
}

impl EvaluationRecorder {
    pub fn new(store: Arc<dyn EvaluationStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        model_run_id: Uuid,
        evaluator_type: &str,
        score: f64,
        feedback: impl Into<String>,
    ) -> Result<Evaluation, RecordError> {
        let evaluation = Evaluation::new(model_run_id, evaluator_type, score, feedback)?;
        let evaluation = self.store.insert_evaluation(evaluation).await?;
        tracing::info!(
            evaluation_id = %evaluation.id(),
            model_run_id = %model_run_id,
            score = evaluation.score(),
            pass = evaluation.pass(),
            "Recorded evaluation"
        );
        Ok(evaluation)
    }

    /// Correct an existing evaluation.
    pub async fn update(
        &self,
        id: Uuid,
        score: f64,
        feedback: impl Into<String>,
    ) -> Result<Evaluation, RecordError> {
        let mut evaluation = self.store.get_evaluation(id).await?;
        evaluation.revise(score, feedback)?;
        self.store.update_evaluation(&evaluation).await?;
        tracing::info!(
            evaluation_id = %id,
            score = evaluation.score(),
            pass = evaluation.pass(),
            "Revised evaluation"
        );
        Ok(evaluation)
    }
}
