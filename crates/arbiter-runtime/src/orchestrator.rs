//! Evaluation pipeline orchestrator.
//!
//! One request runs strictly in order:
//! `Received → WorkflowResolved → ModelRunRecorded → Scored → Persisted → WorkflowCompleted`.
//! Each step consumes the identifier produced by the one before it, so there
//! is no internal parallelism. The grader call is the only step bounded by a
//! timeout and the only one that honours cancellation.
//!
//! Grader failures never fail the pipeline; they become degraded evaluations.
//! Storage failures do, and leave the workflow run incomplete so a retry with
//! the same execution id can pick it up again.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use arbiter_core::{
    EvaluateRequest, Evaluation, EvaluationResponse, ExtractedScore, ExtractionTier, ModelRun,
    PipelineEvent, ReviewAlert, ScoreExtractor, ValidationError,
};

use crate::config::{ConfigError, RuntimeConfig};
use crate::grader::{Grader, GraderError, GradingInput};
use crate::notify::{DeliveryReport, NotificationGate};
use crate::recorders::{EvaluationRecorder, ModelRunRecorder, RecordError};
use crate::registry::{Resolution, WorkflowRunRegistry};
use crate::storage::{EvaluationStore, StorageError};

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    WorkflowResolved,
    ModelRunRecorded,
    Scored,
    Persisted,
    WorkflowCompleted,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::WorkflowCompleted | PipelineStage::Failed)
    }

    /// Successor on the success path.
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Received => Some(PipelineStage::WorkflowResolved),
            PipelineStage::WorkflowResolved => Some(PipelineStage::ModelRunRecorded),
            PipelineStage::ModelRunRecorded => Some(PipelineStage::Scored),
            PipelineStage::Scored => Some(PipelineStage::Persisted),
            PipelineStage::Persisted => Some(PipelineStage::WorkflowCompleted),
            PipelineStage::WorkflowCompleted | PipelineStage::Failed => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::WorkflowResolved => "workflow_resolved",
            PipelineStage::ModelRunRecorded => "model_run_recorded",
            PipelineStage::Scored => "scored",
            PipelineStage::Persisted => "persisted",
            PipelineStage::WorkflowCompleted => "workflow_completed",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by [`EvaluationOrchestrator::evaluate`].
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// `stage` is the last stage reached before the write failed.
    #[error("persistence failed after stage '{stage}': {source}")]
    Persistence {
        stage: PipelineStage,
        source: StorageError,
    },

    #[error("evaluation cancelled after stage '{stage}'")]
    Cancelled { stage: PipelineStage },
}

impl PipelineError {
    /// Whether the caller sent a bad request, as opposed to a server-side
    /// failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{0} not configured")]
    Missing(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A completed request.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub response: EvaluationResponse,
    /// Extraction path that produced the score.
    pub tier: ExtractionTier,
    /// What each step did, in order.
    pub events: Vec<PipelineEvent>,
    /// Background human-review delivery, when the score warranted one.
    pub notification: Option<JoinHandle<DeliveryReport>>,
}

/// Stage tracking for a single request.
struct Progress {
    stage: PipelineStage,
    events: Vec<PipelineEvent>,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Received,
            events: Vec::new(),
        }
    }

    fn advance(&mut self, next: PipelineStage, event: PipelineEvent) {
        debug_assert_eq!(self.stage.next(), Some(next));
        tracing::info!(stage = %next, event = event.name(), "Pipeline stage completed");
        self.stage = next;
        self.events.push(event);
    }

    fn persistence_failed(&self, source: StorageError) -> PipelineError {
        tracing::error!(
            stage = %self.stage,
            next = %PipelineStage::Failed,
            error = %source,
            "Pipeline failed, workflow run left incomplete"
        );
        PipelineError::Persistence {
            stage: self.stage,
            source,
        }
    }

    fn cancelled(&self) -> PipelineError {
        tracing::warn!(stage = %self.stage, "Pipeline cancelled during grading");
        PipelineError::Cancelled { stage: self.stage }
    }
}

pub struct EvaluationOrchestrator {
    store: Arc<dyn EvaluationStore>,
    registry: WorkflowRunRegistry,
    model_runs: ModelRunRecorder,
    evaluations: EvaluationRecorder,
    grader: Arc<dyn Grader>,
    extractor: ScoreExtractor,
    notifications: NotificationGate,
    evaluator_type: String,
    grader_timeout: Duration,
}

impl EvaluationOrchestrator {
    pub fn builder() -> EvaluationOrchestratorBuilder {
        EvaluationOrchestratorBuilder::new()
    }

    /// Run one request through the pipeline.
    pub async fn evaluate(&self, request: &EvaluateRequest) -> Result<PipelineOutcome, PipelineError> {
        self.evaluate_until(request, std::future::pending()).await
    }

    /// Like [`evaluate`](Self::evaluate), but abandons the request if `cancel`
    /// resolves while the grader is running. Nothing after the model run is
    /// written in that case.
    pub async fn evaluate_until<C>(
        &self,
        request: &EvaluateRequest,
        cancel: C,
    ) -> Result<PipelineOutcome, PipelineError>
    where
        C: Future<Output = ()>,
    {
        request.validate().map_err(|e| {
            tracing::warn!(
                platform = %request.platform,
                execution_id = %request.external_execution_id,
                error = %e,
                "Rejected evaluation request"
            );
            e
        })?;

        let mut progress = Progress::new();

        let resolution = self
            .registry
            .get_or_create(request.new_workflow_run())
            .await
            .map_err(|e| progress.persistence_failed(e))?;
        let event = match &resolution {
            Resolution::Created(run) => PipelineEvent::WorkflowRunCreated {
                workflow_run_id: run.id,
                platform: run.platform.clone(),
                external_execution_id: run.external_execution_id.clone(),
            },
            Resolution::Existing(run) => PipelineEvent::WorkflowRunReused {
                workflow_run_id: run.id,
            },
        };
        let workflow_run_id = resolution.run().id;
        progress.advance(PipelineStage::WorkflowResolved, event);

        let model_run = match self.model_runs.create(request.new_model_run(workflow_run_id)).await {
            Ok(run) => run,
            Err(RecordError::Validation(e)) => return Err(PipelineError::Validation(e)),
            Err(RecordError::Storage(e)) => return Err(progress.persistence_failed(e)),
        };
        progress.advance(
            PipelineStage::ModelRunRecorded,
            PipelineEvent::ModelRunRecorded {
                model_run_id: model_run.id,
                workflow_run_id,
            },
        );

        let extracted = tokio::select! {
            biased;
            _ = cancel => return Err(progress.cancelled()),
            extracted = self.score(&model_run) => extracted,
        };
        progress.advance(
            PipelineStage::Scored,
            PipelineEvent::EvaluationScored {
                model_run_id: model_run.id,
                score: extracted.score,
                tier: extracted.tier,
            },
        );

        let evaluation = match self
            .evaluations
            .create(
                model_run.id,
                &self.evaluator_type,
                extracted.score,
                extracted.feedback.clone(),
            )
            .await
        {
            Ok(evaluation) => evaluation,
            Err(RecordError::Validation(e)) => return Err(PipelineError::Validation(e)),
            Err(RecordError::Storage(e)) => return Err(progress.persistence_failed(e)),
        };
        progress.advance(
            PipelineStage::Persisted,
            PipelineEvent::EvaluationRecorded {
                evaluation_id: evaluation.id(),
                model_run_id: model_run.id,
                score: evaluation.score(),
                pass: evaluation.pass(),
            },
        );

        // A low score is still a successful run.
        let workflow_run = self
            .registry
            .mark_completed(workflow_run_id, true, None)
            .await
            .map_err(|e| progress.persistence_failed(e))?;
        progress.advance(
            PipelineStage::WorkflowCompleted,
            PipelineEvent::WorkflowRunCompleted {
                workflow_run_id,
                success: workflow_run.success,
                completed_at: workflow_run.completed_at.unwrap_or_else(Utc::now),
            },
        );

        let response = EvaluationResponse::from_evaluation(&evaluation, workflow_run_id);
        let Progress { mut events, .. } = progress;
        let notification = self.request_review(evaluation, workflow_run, model_run, &mut events);

        Ok(PipelineOutcome {
            response,
            tier: extracted.tier,
            events,
            notification,
        })
    }

    /// Grade a model run under the configured timeout. Never fails.
    async fn score(&self, model_run: &ModelRun) -> ExtractedScore {
        let input = GradingInput {
            task: model_run.task,
            model_name: &model_run.model_name,
            platform: &model_run.platform,
            input: &model_run.input_data,
            output: &model_run.output_data,
        };

        match tokio::time::timeout(self.grader_timeout, self.grader.grade(&input)).await {
            Ok(Ok(text)) => self.extractor.extract(&text),
            Ok(Err(e)) => {
                tracing::warn!(
                    model_run_id = %model_run.id,
                    grader = self.grader.name(),
                    error = %e,
                    "Grader failed, recording degraded evaluation"
                );
                self.extractor.grader_failure(e)
            }
            Err(_) => {
                tracing::warn!(
                    model_run_id = %model_run.id,
                    grader = self.grader.name(),
                    timeout = ?self.grader_timeout,
                    "Grader timed out, recording degraded evaluation"
                );
                self.extractor
                    .grader_failure(GraderError::Timeout(self.grader_timeout))
            }
        }
    }

    fn request_review(
        &self,
        evaluation: Evaluation,
        workflow_run: arbiter_core::WorkflowRun,
        model_run: ModelRun,
        events: &mut Vec<PipelineEvent>,
    ) -> Option<JoinHandle<DeliveryReport>> {
        let evaluation_id = evaluation.id();
        let score = evaluation.score();
        let threshold = self.notifications.threshold();

        let handle = self
            .notifications
            .dispatch(ReviewAlert::new(evaluation, workflow_run, model_run, threshold))?;

        tracing::info!(%evaluation_id, score, threshold, "Human review requested");
        events.push(PipelineEvent::HumanReviewRequested {
            evaluation_id,
            score,
            threshold,
        });
        Some(handle)
    }

    /// Apply an explicit correction to a stored evaluation. Scores outside
    /// `[1.0, 5.0]` are refused and the stored row is left as it was.
    pub async fn revise_evaluation(
        &self,
        id: uuid::Uuid,
        score: f64,
        feedback: impl Into<String>,
    ) -> Result<Evaluation, RecordError> {
        self.evaluations.update(id, score, feedback).await
    }

    pub fn store(&self) -> Arc<dyn EvaluationStore> {
        self.store.clone()
    }

    pub fn notifications(&self) -> &NotificationGate {
        &self.notifications
    }
}

/// Builder for [`EvaluationOrchestrator`].
pub struct EvaluationOrchestratorBuilder {
    store: Option<Arc<dyn EvaluationStore>>,
    grader: Option<Arc<dyn Grader>>,
    notifications: Option<NotificationGate>,
    extractor: Option<ScoreExtractor>,
    config: RuntimeConfig,
}

impl EvaluationOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            grader: None,
            notifications: None,
            extractor: None,
            config: RuntimeConfig::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn EvaluationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn grader(mut self, grader: Arc<dyn Grader>) -> Self {
        self.grader = Some(grader);
        self
    }

    /// Override the gate built from `config.notification`.
    pub fn notifications(mut self, gate: NotificationGate) -> Self {
        self.notifications = Some(gate);
        self
    }

    pub fn extractor(mut self, extractor: ScoreExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<EvaluationOrchestrator, BuildError> {
        self.config.validate()?;

        let store = self.store.ok_or(BuildError::Missing("store"))?;
        let grader = self.grader.ok_or(BuildError::Missing("grader"))?;
        let notifications = self
            .notifications
            .unwrap_or_else(|| NotificationGate::from_config(&self.config.notification));

        tracing::debug!(
            grader = grader.name(),
            evaluator_type = %self.config.evaluator_type,
            channels = ?notifications.channel_names(),
            "Built evaluation orchestrator"
        );

        Ok(EvaluationOrchestrator {
            registry: WorkflowRunRegistry::new(store.clone()),
            model_runs: ModelRunRecorder::new(store.clone()),
            evaluations: EvaluationRecorder::new(store.clone()),
            store,
            grader,
            extractor: self.extractor.unwrap_or_default(),
            notifications,
            evaluator_type: self.config.evaluator_type,
            grader_timeout: self.config.grader.timeout,
        })
    }
}

impl Default for EvaluationOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
