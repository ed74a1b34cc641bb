//! Fault-injecting store for pipeline tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use uuid::Uuid;

use arbiter_core::{Evaluation, EvaluationRecord, HistoryQuery, ModelRun, WorkflowRun};

use super::{EvaluationStore, InMemoryStore, Result, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Fault {
    /// The next lookup misses, as if another replica inserted concurrently.
    MissNextLookup,
    FindWorkflowRun,
    InsertModelRun,
    InsertEvaluation,
    UpdateWorkflowRun,
}

#[derive(Default)]
pub(crate) struct FaultyStore {
    pub inner: InMemoryStore,
    faults: Mutex<HashSet<Fault>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&self, fault: Fault) {
        self.faults.lock().insert(fault);
    }

    pub fn heal(&self) {
        self.faults.lock().clear();
    }

    fn check(&self, fault: Fault) -> Result<()> {
        if self.faults.lock().contains(&fault) {
            Err(StorageError::Unavailable(format!("injected {:?}", fault)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EvaluationStore for FaultyStore {
    async fn find_workflow_run(
        &self,
        platform: &str,
        external_execution_id: &str,
    ) -> Result<Option<WorkflowRun>> {
        if self.faults.lock().remove(&Fault::MissNextLookup) {
            return Ok(None);
        }
        self.check(Fault::FindWorkflowRun)?;
        self.inner.find_workflow_run(platform, external_execution_id).await
    }

    async fn get_workflow_run(&self, id: Uuid) -> Result<WorkflowRun> {
        self.inner.get_workflow_run(id).await
    }

    async fn insert_workflow_run(&self, run: WorkflowRun) -> Result<WorkflowRun> {
        self.inner.insert_workflow_run(run).await
    }

    async fn update_workflow_run(&self, run: &WorkflowRun) -> Result<()> {
        self.check(Fault::UpdateWorkflowRun)?;
        self.inner.update_workflow_run(run).await
    }

    async fn insert_model_run(&self, run: ModelRun) -> Result<ModelRun> {
        self.check(Fault::InsertModelRun)?;
        self.inner.insert_model_run(run).await
    }

    async fn get_model_run(&self, id: Uuid) -> Result<ModelRun> {
        self.inner.get_model_run(id).await
    }

    async fn insert_evaluation(&self, evaluation: Evaluation) -> Result<Evaluation> {
        self.check(Fault::InsertEvaluation)?;
        self.inner.insert_evaluation(evaluation).await
    }

    async fn get_evaluation(&self, id: Uuid) -> Result<Evaluation> {
        self.inner.get_evaluation(id).await
    }

    async fn update_evaluation(&self, evaluation: &Evaluation) -> Result<()> {
        self.inner.update_evaluation(evaluation).await
    }

    async fn query_evaluations(&self, query: &HistoryQuery) -> Result<Vec<EvaluationRecord>> {
        self.inner.query_evaluations(query).await
    }
}
