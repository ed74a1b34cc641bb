//! Idempotent workflow-run registration.

use std::sync::Arc;
use uuid::Uuid;

use arbiter_core::{NewWorkflowRun, WorkflowRun};

use crate::storage::{EvaluationStore, StorageError};

/// How a run was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Created(WorkflowRun),
    /// An earlier request (or a concurrent one that won the insert) owns it.
    Existing(WorkflowRun),
}

impl Resolution {
    pub fn run(&self) -> &WorkflowRun {
        match self {
            Resolution::Created(run) | Resolution::Existing(run) => run,
        }
    }

    pub fn into_run(self) -> WorkflowRun {
        match self {
            Resolution::Created(run) | Resolution::Existing(run) => run,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

pub struct WorkflowRunRegistry {
    store: Arc<dyn EvaluationStore>,
}

impl WorkflowRunRegistry {
    pub fn new(store: Arc<dyn EvaluationStore>) -> Self {
        Self { store }
    }

    /// Return the run for `(platform, external_execution_id)`, creating it if
    /// absent. Existing runs are returned unchanged.
    pub async fn get_or_create(&self, new: NewWorkflowRun) -> Result<Resolution, StorageError> {
        if let Some(existing) = self
            .store
            .find_workflow_run(&new.platform, &new.external_execution_id)
            .await?
        {
            tracing::debug!(workflow_run_id = %existing.id, "Reusing workflow run");
            return Ok(Resolution::Existing(existing));
        }

        let platform = new.platform.clone();
        let execution_id = new.external_execution_id.clone();

        match self.store.insert_workflow_run(WorkflowRun::start(new)).await {
            Ok(run) => {
                tracing::info!(
                    workflow_run_id = %run.id,
                    platform = %run.platform,
                    execution_id = %run.external_execution_id,
                    "Created workflow run"
                );
                Ok(Resolution::Created(run))
            }
            Err(StorageError::Conflict(reason)) => {
                // Lost the insert race; the winner's row is authoritative.
                tracing::debug!(%reason, "Workflow run insert conflicted, re-reading");
                self.store
                    .find_workflow_run(&platform, &execution_id)
                    .await?
                    .map(Resolution::Existing)
                    .ok_or_else(|| {
                        StorageError::Unavailable(format!(
                            "workflow run for {} execution '{}' conflicted but could not be read",
                            platform, execution_id
                        ))
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Record the pipeline outcome on a run.
    pub async fn mark_completed(
        &self,
        id: Uuid,
        success: bool,
        error_message: Option<String>,
    ) -> Result<WorkflowRun, StorageError> {
        let mut run = self.store.get_workflow_run(id).await?;
        run.complete(success, error_message);
        self.store.update_workflow_run(&run).await?;
        tracing::info!(workflow_run_id = %id, success, "Workflow run completed");
        Ok(run)
    }
}
