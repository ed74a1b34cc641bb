//! Domain records for workflow runs, model runs and evaluations.
//!
//! Records are plain data. Derived fields (`Evaluation::pass`) are computed by
//! the constructors here and never accepted from callers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evaluation::{check_score, passes};
use crate::ValidationError;

/// The kind of AI task a model run performed.
///
/// `Unknown` exists so that unrecognised input can be represented and
/// rejected; it is never a valid value for a persisted [`ModelRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TaskType {
    Unknown,
    Summarize,
    Classify,
    Generate,
    Translate,
    Extract,
    Analyze,
    Draft,
    QuestionAnswer,
}

impl TaskType {
    /// All tasks accepted for persistence.
    pub const KNOWN: [TaskType; 8] = [
        TaskType::Summarize,
        TaskType::Classify,
        TaskType::Generate,
        TaskType::Translate,
        TaskType::Extract,
        TaskType::Analyze,
        TaskType::Draft,
        TaskType::QuestionAnswer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Unknown => "Unknown",
            TaskType::Summarize => "Summarize",
            TaskType::Classify => "Classify",
            TaskType::Generate => "Generate",
            TaskType::Translate => "Translate",
            TaskType::Extract => "Extract",
            TaskType::Analyze => "Analyze",
            TaskType::Draft => "Draft",
            TaskType::QuestionAnswer => "QuestionAnswer",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TaskType::Unknown)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = ValidationError;

    /// Case-insensitive; `question_answer` and `question-answer` are accepted
    /// alongside `QuestionAnswer`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "unknown" => Ok(TaskType::Unknown),
            "summarize" => Ok(TaskType::Summarize),
            "classify" => Ok(TaskType::Classify),
            "generate" => Ok(TaskType::Generate),
            "translate" => Ok(TaskType::Translate),
            "extract" => Ok(TaskType::Extract),
            "analyze" => Ok(TaskType::Analyze),
            "draft" => Ok(TaskType::Draft),
            "questionanswer" => Ok(TaskType::QuestionAnswer),
            _ => Err(ValidationError::InvalidValue {
                field: "task".to_string(),
                reason: format!("unrecognised task '{}'", s),
            }),
        }
    }
}

impl TryFrom<String> for TaskType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskType> for String {
    fn from(task: TaskType) -> Self {
        task.as_str().to_string()
    }
}

/// Whether the external workflow ran in test or production mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExecutionMode {
    Test,
    Production,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Test => "test",
            ExecutionMode::Production => "production",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "test" => Ok(ExecutionMode::Test),
            "production" => Ok(ExecutionMode::Production),
            _ => Err(ValidationError::InvalidValue {
                field: "mode".to_string(),
                reason: "mode must be 'test' or 'production'".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ExecutionMode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExecutionMode> for String {
    fn from(mode: ExecutionMode) -> Self {
        mode.as_str().to_string()
    }
}

/// One execution of a workflow on an external automation platform.
///
/// `(platform, external_execution_id)` identifies at most one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: Uuid,
    pub platform: String,
    pub external_workflow_id: String,
    pub external_execution_id: String,
    pub workflow_name: String,
    pub triggered_by: String,
    pub mode: ExecutionMode,
    pub session_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Only meaningful once `completed_at` is set.
    pub success: bool,
    pub error_message: Option<String>,
}

/// Identity and metadata for a new [`WorkflowRun`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkflowRun {
    pub platform: String,
    pub external_execution_id: String,
    pub external_workflow_id: String,
    pub workflow_name: String,
    pub triggered_by: String,
    pub mode: ExecutionMode,
    pub session_id: Option<String>,
}

impl WorkflowRun {
    /// Start a new, not yet completed run.
    pub fn start(new: NewWorkflowRun) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform: new.platform,
            external_workflow_id: new.external_workflow_id,
            external_execution_id: new.external_execution_id,
            workflow_name: new.workflow_name,
            triggered_by: new.triggered_by,
            mode: new.mode,
            session_id: new.session_id,
            started_at: Utc::now(),
            completed_at: None,
            success: false,
            error_message: None,
        }
    }

    /// Record the pipeline outcome for this run.
    pub fn complete(&mut self, success: bool, error_message: Option<String>) {
        self.completed_at = Some(Utc::now());
        self.success = success;
        self.error_message = if success { None } else { error_message };
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// One AI-model invocation inside a workflow run. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRun {
    pub id: Uuid,
    pub workflow_run_id: Uuid,
    pub platform: String,
    pub external_node_id: String,
    pub task: TaskType,
    pub model_name: String,
    pub model_provider: String,
    pub prompt_version: Option<String>,
    pub input_data: serde_json::Value,
    pub output_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new [`ModelRun`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewModelRun {
    pub workflow_run_id: Uuid,
    pub platform: String,
    pub external_node_id: String,
    pub task: TaskType,
    pub model_name: String,
    pub model_provider: String,
    pub prompt_version: Option<String>,
    pub input_data: serde_json::Value,
    pub output_data: serde_json::Value,
}

impl ModelRun {
    /// Build a model run, rejecting the `Unknown` task.
    pub fn new(new: NewModelRun) -> Result<Self, ValidationError> {
        if !new.task.is_known() {
            return Err(ValidationError::UnknownTask);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            workflow_run_id: new.workflow_run_id,
            platform: new.platform,
            external_node_id: new.external_node_id,
            task: new.task,
            model_name: new.model_name,
            model_provider: new.model_provider,
            prompt_version: new.prompt_version,
            input_data: new.input_data,
            output_data: new.output_data,
            created_at: Utc::now(),
        })
    }
}

/// A graded verdict on a model run.
///
/// `pass` always equals `score >= PASS_THRESHOLD` and `score` stays inside
/// `[1.0, 5.0]`. Fields are private and deserialization goes through
/// [`EvaluationRow`], so neither can be broken after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EvaluationRow")]
pub struct Evaluation {
    id: Uuid,
    model_run_id: Uuid,
    evaluator_type: String,
    score: f64,
    pass: bool,
    feedback: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

/// Stored shape of an [`Evaluation`]. A `pass` column, if present, is
/// ignored and derived again from `score`.
#[derive(Deserialize)]
struct EvaluationRow {
    id: Uuid,
    model_run_id: Uuid,
    evaluator_type: String,
    score: f64,
    feedback: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<EvaluationRow> for Evaluation {
    type Error = ValidationError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let score = check_score(row.score)?;
        Ok(Self {
            id: row.id,
            model_run_id: row.model_run_id,
            evaluator_type: row.evaluator_type,
            score,
            pass: passes(score),
            feedback: row.feedback,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Evaluation {
    /// Fails when `score` is non-finite or outside `[1.0, 5.0]`.
    pub fn new(
        model_run_id: Uuid,
        evaluator_type: impl Into<String>,
        score: f64,
        feedback: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let score = check_score(score)?;
        Ok(Self {
            id: Uuid::new_v4(),
            model_run_id,
            evaluator_type: evaluator_type.into(),
            score,
            pass: passes(score),
            feedback: feedback.into(),
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    /// Correct the score and feedback; `pass` is derived again. The
    /// evaluation is left untouched when the score is rejected.
    pub fn revise(
        &mut self,
        score: f64,
        feedback: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let score = check_score(score)?;
        self.score = score;
        self.pass = passes(score);
        self.feedback = feedback.into();
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model_run_id(&self) -> Uuid {
        self.model_run_id
    }

    pub fn evaluator_type(&self) -> &str {
        &self.evaluator_type
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn pass(&self) -> bool {
        self.pass
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Result returned to the caller of an evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub score: f64,
    pub pass: bool,
    pub feedback: String,
    pub workflow_run_id: Uuid,
    pub model_run_id: Uuid,
    pub evaluation_id: Uuid,
    pub evaluator_type: String,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResponse {
    pub fn from_evaluation(evaluation: &Evaluation, workflow_run_id: Uuid) -> Self {
        Self {
            score: evaluation.score(),
            pass: evaluation.pass(),
            feedback: evaluation.feedback().to_string(),
            workflow_run_id,
            model_run_id: evaluation.model_run_id(),
            evaluation_id: evaluation.id(),
            evaluator_type: evaluation.evaluator_type().to_string(),
            evaluated_at: evaluation.created_at(),
        }
    }
}
