//! Evaluation history filtering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluation::EvaluationStatistics;
use crate::types::{Evaluation, ModelRun, TaskType, WorkflowRun};

/// Default number of records returned by a history query.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// An evaluation joined with the runs it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub evaluation: Evaluation,
    pub model_run: ModelRun,
    pub workflow_run: WorkflowRun,
}

/// Filters over evaluation history. Unset filters match everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryQuery {
    pub limit: usize,
    /// Case-insensitive equality.
    pub platform: Option<String>,
    /// Case-insensitive substring.
    pub workflow_name: Option<String>,
    pub task: Option<TaskType>,
    pub model_name: Option<String>,
    pub evaluator_type: Option<String>,
    pub pass: Option<bool>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
            platform: None,
            workflow_name: None,
            task: None,
            model_name: None,
            evaluator_type: None,
            pass: None,
            min_score: None,
            max_score: None,
            from: None,
            to: None,
        }
    }
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn workflow_name(mut self, name: impl Into<String>) -> Self {
        self.workflow_name = Some(name.into());
        self
    }

    pub fn task(mut self, task: TaskType) -> Self {
        self.task = Some(task);
        self
    }

    pub fn pass(mut self, pass: bool) -> Self {
        self.pass = Some(pass);
        self
    }

    pub fn score_between(mut self, min: f64, max: f64) -> Self {
        self.min_score = Some(min);
        self.max_score = Some(max);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Whether a record passes every set filter.
    pub fn matches(&self, record: &EvaluationRecord) -> bool {
        let evaluation = &record.evaluation;
        let created_at = evaluation.created_at();

        if let Some(platform) = &self.platform {
            if !record.workflow_run.platform.eq_ignore_ascii_case(platform) {
                return false;
            }
        }
        if let Some(name) = &self.workflow_name {
            let haystack = record.workflow_run.workflow_name.to_lowercase();
            if !haystack.contains(&name.to_lowercase()) {
                return false;
            }
        }
        if self.task.is_some_and(|task| task != record.model_run.task) {
            return false;
        }
        if let Some(model) = &self.model_name {
            if &record.model_run.model_name != model {
                return false;
            }
        }
        if let Some(evaluator) = &self.evaluator_type {
            if evaluation.evaluator_type() != evaluator {
                return false;
            }
        }
        if self.pass.is_some_and(|pass| pass != evaluation.pass()) {
            return false;
        }
        if self.min_score.is_some_and(|min| evaluation.score() < min) {
            return false;
        }
        if self.max_score.is_some_and(|max| evaluation.score() > max) {
            return false;
        }
        if self.from.is_some_and(|from| created_at < from) {
            return false;
        }
        if self.to.is_some_and(|to| created_at > to) {
            return false;
        }
        true
    }

    /// Filter, order newest first and truncate to `limit`.
    pub fn apply(&self, records: impl IntoIterator<Item = EvaluationRecord>) -> Vec<EvaluationRecord> {
        let mut matched: Vec<EvaluationRecord> =
            records.into_iter().filter(|r| self.matches(r)).collect();
        matched.sort_by(|a, b| b.evaluation.created_at().cmp(&a.evaluation.created_at()));
        matched.truncate(self.limit);
        matched
    }
}

/// A filtered history window and its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationHistory {
    pub records: Vec<EvaluationRecord>,
    pub statistics: EvaluationStatistics,
}

impl EvaluationHistory {
    pub fn new(records: Vec<EvaluationRecord>) -> Self {
        let statistics = EvaluationStatistics::from_evaluations(records.iter().map(|r| &r.evaluation));
        Self { records, statistics }
    }
}
