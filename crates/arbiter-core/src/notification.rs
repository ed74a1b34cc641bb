//! Human-review escalation policy and alert rendering.
//!
//! Escalation is decided by an operator-configured threshold that is
//! independent of [`crate::evaluation::PASS_THRESHOLD`]. A run can pass and
//! still be escalated, or fail without escalation.

use serde::{Deserialize, Serialize};

use crate::types::{Evaluation, ModelRun, WorkflowRun};

/// Default score below which reviewers are notified.
pub const DEFAULT_HUMAN_FEEDBACK_THRESHOLD: f64 = 3.5;

/// Footer attached to rendered alerts.
const ALERT_SOURCE: &str = "Arbiter AI Evaluation System";

const ALERT_TITLE: &str = "AI Output Quality Alert - Human Review Required";

/// Whether a score warrants human review.
pub fn should_notify(score: f64, threshold: f64) -> bool {
    score < threshold
}

/// Operator policy for escalations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotificationPolicy {
    pub enabled: bool,
    pub human_feedback_threshold: f64,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            human_feedback_threshold: DEFAULT_HUMAN_FEEDBACK_THRESHOLD,
        }
    }
}

impl NotificationPolicy {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            human_feedback_threshold: threshold,
            ..Default::default()
        }
    }

    /// Escalate iff enabled and `score < threshold`. The pass verdict plays no part.
    pub fn should_notify(&self, score: f64) -> bool {
        self.enabled && should_notify(score, self.human_feedback_threshold)
    }
}

/// Colour band for an escalated score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Borderline,
    Poor,
    VeryPoor,
}

impl Severity {
    pub fn for_score(score: f64) -> Self {
        if score >= 3.0 {
            Severity::Borderline
        } else if score >= 2.0 {
            Severity::Poor
        } else {
            Severity::VeryPoor
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Severity::Borderline => "#ffa500",
            Severity::Poor => "#ff8c00",
            Severity::VeryPoor => "#ff0000",
        }
    }
}

/// Everything a reviewer needs to look at one low-scoring output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAlert {
    pub evaluation: Evaluation,
    pub workflow_run: WorkflowRun,
    pub model_run: ModelRun,
    pub threshold: f64,
}

impl ReviewAlert {
    pub fn new(
        evaluation: Evaluation,
        workflow_run: WorkflowRun,
        model_run: ModelRun,
        threshold: f64,
    ) -> Self {
        Self {
            evaluation,
            workflow_run,
            model_run,
            threshold,
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::for_score(self.evaluation.score())
    }

    /// Chat-webhook payload with one coloured attachment.
    pub fn chat_payload(&self) -> serde_json::Value {
        let evaluation = &self.evaluation;
        let created_at = evaluation.created_at();
        let field = |title: &str, value: String, short: bool| {
            serde_json::json!({ "title": title, "value": value, "short": short })
        };

        serde_json::json!({
            "text": ALERT_TITLE,
            "attachments": [{
                "color": self.severity().color(),
                "fields": [
                    field("Workflow", self.workflow_run.workflow_name.clone(), true),
                    field("Platform", self.workflow_run.platform.clone(), true),
                    field("Task", self.model_run.task.to_string(), true),
                    field("Model", self.model_run.model_name.clone(), true),
                    field("Score", format!("{}/5.0", evaluation.score()), true),
                    field("Threshold", format!("{}/5.0", self.threshold), true),
                    field("Feedback", evaluation.feedback().to_string(), false),
                    field("Execution ID", self.workflow_run.external_execution_id.clone(), true),
                    field("Timestamp", created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(), true),
                ],
                "footer": ALERT_SOURCE,
                "ts": created_at.timestamp(),
            }]
        })
    }

    pub fn email_subject(&self) -> String {
        format!(
            "{}: {} scored {}/5.0",
            ALERT_TITLE,
            self.workflow_run.workflow_name,
            self.evaluation.score()
        )
    }

    /// Plain-text email body.
    pub fn email_body(&self) -> String {
        let run = &self.workflow_run;
        let evaluation = &self.evaluation;

        format!(
            "{title}\n\n\
             Workflow: {workflow}\n\
             Platform: {platform}\n\
             Task: {task}\n\
             Model: {model}\n\
             Score: {score}/5.0 (Threshold: {threshold}/5.0)\n\n\
             Feedback: {feedback}\n\n\
             Execution Details:\n\
             - Execution ID: {execution}\n\
             - Session ID: {session}\n\
             - Triggered By: {triggered_by}\n\
             - Mode: {mode}\n\
             - Timestamp: {timestamp}\n\n\
             Please review this AI output and provide feedback to improve the system.\n\n\
             ---\n\
             {source}",
            title = ALERT_TITLE,
            workflow = run.workflow_name,
            platform = run.platform,
            task = self.model_run.task,
            model = self.model_run.model_name,
            score = evaluation.score(),
            threshold = self.threshold,
            feedback = evaluation.feedback(),
            execution = run.external_execution_id,
            session = run.session_id.as_deref().unwrap_or("-"),
            triggered_by = run.triggered_by,
            mode = run.mode,
            timestamp = evaluation.created_at().format("%Y-%m-%d %H:%M:%S UTC"),
            source = ALERT_SOURCE,
        )
    }
}
