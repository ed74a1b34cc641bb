//! Evaluation history and statistics over the store.

use std::sync::Arc;

use arbiter_core::{EvaluationHistory, EvaluationStatistics, HistoryQuery};

use crate::storage::{EvaluationStore, StorageError};

pub struct HistoryService {
    store: Arc<dyn EvaluationStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn EvaluationStore>) -> Self {
        Self { store }
    }

    /// Matching evaluations, newest first, with statistics over the same window.
    pub async fn history(&self, query: &HistoryQuery) -> Result<EvaluationHistory, StorageError> {
        let records = self.store.query_evaluations(query).await?;
        tracing::debug!(matched = records.len(), limit = query.limit, "History query");
        Ok(EvaluationHistory::new(records))
    }

    pub async fn statistics(&self, query: &HistoryQuery) -> Result<EvaluationStatistics, StorageError> {
        Ok(self.history(query).await?.statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grader::FixedResponseGrader;
    use crate::notify::NotificationGate;
    use crate::orchestrator::EvaluationOrchestrator;
    use crate::storage::InMemoryStore;
    use arbiter_core::{EvaluateRequest, ExecutionMode, NotificationPolicy, TaskType};
    use std::time::Duration;

    fn request(execution: &str, task: TaskType) -> EvaluateRequest {
        EvaluateRequest {
            platform: "Make".to_string(),
            external_execution_id: execution.to_string(),
            workflow_id: "wf-7".to_string(),
            workflow_name: "Support Triage".to_string(),
            triggered_by: "webhook".to_string(),
            mode: ExecutionMode::Test,
            session_id: Some("session-9".to_string()),
            node_id: "classify".to_string(),
            task,
            model_name: "claude-3-haiku".to_string(),
            model_provider: "anthropic".to_string(),
            prompt_version: None,
            input_data: serde_json::json!({"ticket": "Refund please"}),
            output_data: serde_json::json!({"label": "billing"}),
        }
    }

    async fn seed(store: Arc<InMemoryStore>, response: &str, task: TaskType, executions: &[&str]) {
        let orchestrator = EvaluationOrchestrator::builder()
            .store(store)
            .grader(Arc::new(FixedResponseGrader::new(response)))
            .notifications(NotificationGate::new(
                NotificationPolicy {
                    enabled: false,
                    ..Default::default()
                },
                Duration::from_secs(1),
            ))
            .build()
            .unwrap();
        for execution in executions {
            orchestrator.evaluate(&request(execution, task)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_history_with_statistics() {
        let store = Arc::new(InMemoryStore::new());
        seed(store.clone(), "Score: 4.5", TaskType::Classify, &["a", "b"]).await;
        seed(store.clone(), "Score: 2", TaskType::Extract, &["c"]).await;

        let service = HistoryService::new(store);
        let history = service.history(&HistoryQuery::new()).await.unwrap();

        assert_eq!(history.records.len(), 3);
        assert_eq!(history.statistics.total, 3);
        assert_eq!(history.statistics.passed, 2);
        assert_eq!(history.statistics.failed, 1);
        assert_eq!(history.statistics.min_score, 2.0);
        assert_eq!(history.statistics.max_score, 4.5);
    }

    #[tokio::test]
    async fn test_statistics_follow_filter() {
        let store = Arc::new(InMemoryStore::new());
        seed(store.clone(), "Score: 4.5", TaskType::Classify, &["a"]).await;
        seed(store.clone(), "Score: 2", TaskType::Extract, &["b", "c"]).await;

        let service = HistoryService::new(store);
        let stats = service
            .statistics(&HistoryQuery::new().task(TaskType::Extract))
            .await
            .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.passed, 0);
        assert_eq!(stats.average_score, 2.0);
    }

    #[tokio::test]
    async fn test_empty_history() {
        let service = HistoryService::new(Arc::new(InMemoryStore::new()));
        let history = service.history(&HistoryQuery::new().platform("zapier")).await.unwrap();
        assert!(history.records.is_empty());
        assert_eq!(history.statistics.average_score, 0.0);
    }
}
