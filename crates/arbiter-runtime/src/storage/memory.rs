//! In-memory store.
//!
//! Suitable for tests and single-process CLI runs. Enforces the same unique
//! index and ownership checks a relational backend would.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use arbiter_core::{Evaluation, EvaluationRecord, HistoryQuery, ModelRun, WorkflowRun};

use super::{EvaluationStore, Result, StorageError};

#[derive(Default)]
struct Tables {
    workflow_runs: HashMap<Uuid, WorkflowRun>,
    /// Unique index on (platform, external_execution_id).
    executions: HashMap<(String, String), Uuid>,
    model_runs: HashMap<Uuid, ModelRun>,
    evaluations: HashMap<Uuid, Evaluation>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workflow_run_count(&self) -> usize {
        self.tables.read().workflow_runs.len()
    }

    pub fn model_run_count(&self) -> usize {
        self.tables.read().model_runs.len()
    }

    pub fn evaluation_count(&self) -> usize {
        self.tables.read().evaluations.len()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("InMemoryStore")
            .field("workflow_runs", &tables.workflow_runs.len())
            .field("model_runs", &tables.model_runs.len())
            .field("evaluations", &tables.evaluations.len())
            .finish()
    }
}

#[async_trait]
impl EvaluationStore for InMemoryStore {
    async fn find_workflow_run(
        &self,
        platform: &str,
        external_execution_id: &str,
    ) -> Result<Option<WorkflowRun>> {
        let tables = self.tables.read();
        let key = (platform.to_string(), external_execution_id.to_string());
        Ok(tables
            .executions
            .get(&key)
            .and_then(|id| tables.workflow_runs.get(id))
            .cloned())
    }

    async fn get_workflow_run(&self, id: Uuid) -> Result<WorkflowRun> {
        self.tables
            .read()
            .workflow_runs
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound {
                entity: "workflow run",
                id,
            })
    }

    async fn insert_workflow_run(&self, run: WorkflowRun) -> Result<WorkflowRun> {
        let mut tables = self.tables.write();
        let key = (run.platform.clone(), run.external_execution_id.clone());
        if tables.executions.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "workflow run for {} execution '{}' already exists",
                run.platform, run.external_execution_id
            )));
        }
        tables.executions.insert(key, run.id);
        tables.workflow_runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn update_workflow_run(&self, run: &WorkflowRun) -> Result<()> {
        let mut tables = self.tables.write();
        match tables.workflow_runs.get_mut(&run.id) {
            Some(existing) => {
                *existing = run.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound {
                entity: "workflow run",
                id: run.id,
            }),
        }
    }

    async fn insert_model_run(&self, run: ModelRun) -> Result<ModelRun> {
        let mut tables = self.tables.write();
        if !tables.workflow_runs.contains_key(&run.workflow_run_id) {
            return Err(StorageError::NotFound {
                entity: "workflow run",
                id: run.workflow_run_id,
            });
        }
        tables.model_runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn get_model_run(&self, id: Uuid) -> Result<ModelRun> {
        self.tables
            .read()
            .model_runs
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound {
                entity: "model run",
                id,
            })
    }

    async fn insert_evaluation(&self, evaluation: Evaluation) -> Result<Evaluation> {
        let mut tables = self.tables.write();
        if !tables.model_runs.contains_key(&evaluation.model_run_id()) {
            return Err(StorageError::NotFound {
                entity: "model run",
                id: evaluation.model_run_id(),
            });
        }
        tables.evaluations.insert(evaluation.id(), evaluation.clone());
        Ok(evaluation)
    }

    async fn get_evaluation(&self, id: Uuid) -> Result<Evaluation> {
        self.tables
            .read()
            .evaluations
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound {
                entity: "evaluation",
                id,
            })
    }

    async fn update_evaluation(&self, evaluation: &Evaluation) -> Result<()> {
        let mut tables = self.tables.write();
        match tables.evaluations.get_mut(&evaluation.id()) {
            Some(existing) => {
                *existing = evaluation.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound {
                entity: "evaluation",
                id: evaluation.id(),
            }),
        }
    }

    async fn query_evaluations(&self, query: &HistoryQuery) -> Result<Vec<EvaluationRecord>> {
        let tables = self.tables.read();
        let records = tables.evaluations.values().filter_map(|evaluation| {
            let model_run = tables.model_runs.get(&evaluation.model_run_id())?;
            let workflow_run = tables.workflow_runs.get(&model_run.workflow_run_id)?;
            Some(EvaluationRecord {
                evaluation: evaluation.clone(),
                model_run: model_run.clone(),
                workflow_run: workflow_run.clone(),
            })
        });
        Ok(query.apply(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::{ExecutionMode, NewModelRun, NewWorkflowRun, TaskType};

    fn workflow_run(execution: &str) -> WorkflowRun {
        WorkflowRun::start(NewWorkflowRun {
            platform: "n8n".to_string(),
            external_execution_id: execution.to_string(),
            external_workflow_id: "wf-1".to_string(),
            workflow_name: "Digest".to_string(),
            triggered_by: "cron".to_string(),
            mode: ExecutionMode::Test,
            session_id: None,
        })
    }

    fn model_run(workflow_run_id: Uuid) -> ModelRun {
        ModelRun::new(NewModelRun {
            workflow_run_id,
            platform: "n8n".to_string(),
            external_node_id: "node-1".to_string(),
            task: TaskType::Summarize,
            model_name: "gpt-4o".to_string(),
            model_provider: "openai".to_string(),
            prompt_version: None,
            input_data: serde_json::json!({}),
            output_data: serde_json::json!({}),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_unique_execution_index() {
        let store = InMemoryStore::new();
        store.insert_workflow_run(workflow_run("exec-1")).await.unwrap();

        let duplicate = store.insert_workflow_run(workflow_run("exec-1")).await;
        assert!(matches!(duplicate, Err(StorageError::Conflict(_))));
        assert_eq!(store.workflow_run_count(), 1);
    }

    #[tokio::test]
    async fn test_same_execution_on_other_platform_is_distinct() {
        let store = InMemoryStore::new();
        store.insert_workflow_run(workflow_run("exec-1")).await.unwrap();

        let mut other = workflow_run("exec-1");
        other.platform = "Make".to_string();
        assert!(store.insert_workflow_run(other).await.is_ok());
        assert!(store.find_workflow_run("Make", "exec-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_model_run_requires_workflow_run() {
        let store = InMemoryStore::new();
        let result = store.insert_model_run(model_run(Uuid::new_v4())).await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_evaluation_round_trip_and_query() {
        let store = InMemoryStore::new();
        let run = store.insert_workflow_run(workflow_run("exec-2")).await.unwrap();
        let model = store.insert_model_run(model_run(run.id)).await.unwrap();
        let evaluation = store
            .insert_evaluation(Evaluation::new(model.id, "llm", 4.0, "Good").unwrap())
            .await
            .unwrap();

        assert_eq!(store.get_evaluation(evaluation.id()).await.unwrap(), evaluation);

        let records = store.query_evaluations(&HistoryQuery::new()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].workflow_run.id, run.id);
    }

    #[tokio::test]
    async fn test_update_missing_evaluation() {
        let store = InMemoryStore::new();
        let evaluation = Evaluation::new(Uuid::new_v4(), "llm", 2.0, "Weak").unwrap();
        assert!(matches!(
            store.update_evaluation(&evaluation).await,
            Err(StorageError::NotFound { .. })
        ));
    }
}
