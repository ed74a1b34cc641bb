//! Pipeline events.
//!
//! Each pipeline step returns a value describing what it did; the
//! orchestrator collects these into an outbox returned with the response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extraction::ExtractionTier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    WorkflowRunCreated {
        workflow_run_id: Uuid,
        platform: String,
        external_execution_id: String,
    },
    /// A request reused an existing run for the same execution.
    WorkflowRunReused {
        workflow_run_id: Uuid,
    },
    ModelRunRecorded {
        model_run_id: Uuid,
        workflow_run_id: Uuid,
    },
    EvaluationScored {
        model_run_id: Uuid,
        score: f64,
        tier: ExtractionTier,
    },
    EvaluationRecorded {
        evaluation_id: Uuid,
        model_run_id: Uuid,
        score: f64,
        pass: bool,
    },
    WorkflowRunCompleted {
        workflow_run_id: Uuid,
        success: bool,
        completed_at: DateTime<Utc>,
    },
    HumanReviewRequested {
        evaluation_id: Uuid,
        score: f64,
        threshold: f64,
    },
}

impl PipelineEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::WorkflowRunCreated { .. } => "workflow_run_created",
            PipelineEvent::WorkflowRunReused { .. } => "workflow_run_reused",
            PipelineEvent::ModelRunRecorded { .. } => "model_run_recorded",
            PipelineEvent::EvaluationScored { .. } => "evaluation_scored",
            PipelineEvent::EvaluationRecorded { .. } => "evaluation_recorded",
            PipelineEvent::WorkflowRunCompleted { .. } => "workflow_run_completed",
            PipelineEvent::HumanReviewRequested { .. } => "human_review_requested",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = PipelineEvent::EvaluationScored {
            model_run_id: Uuid::nil(),
            score: 1.0,
            tier: ExtractionTier::EmptyResponse,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "evaluation_scored");
        assert_eq!(json["tier"], "empty_response");
        assert_eq!(event.name(), "evaluation_scored");
    }
}
