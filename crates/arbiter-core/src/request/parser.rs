//! Evaluation request decoding and validation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_request_schema;
use crate::types::{ExecutionMode, NewModelRun, NewWorkflowRun, TaskType};
use crate::ValidationError;

/// Platforms whose executions are accepted.
pub const SUPPORTED_PLATFORMS: [&str; 5] = ["n8n", "Make", "Power Automate", "zapier", "integromat"];

/// Model providers whose runs are accepted.
pub const SUPPORTED_PROVIDERS: [&str; 7] = [
    "openai",
    "anthropic",
    "google",
    "azure",
    "aws",
    "meta",
    "huggingface",
];

/// Errors that can occur when reading a request.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Failed to read request file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Request does not match schema: {}", .0.join("; "))]
    SchemaViolations(Vec<String>),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// One model-run evaluation reported by an automation platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub platform: String,

    /// Sent as `executionId` or `externalExecutionId`. The schema rejects
    /// requests carrying both.
    #[serde(rename = "executionId", alias = "externalExecutionId")]
    pub external_execution_id: String,

    pub workflow_id: String,
    pub workflow_name: String,
    pub triggered_by: String,
    pub mode: ExecutionMode,

    #[serde(default)]
    pub session_id: Option<String>,

    pub node_id: String,
    pub task: TaskType,
    pub model_name: String,
    pub model_provider: String,

    #[serde(default)]
    pub prompt_version: Option<String>,

    pub input_data: serde_json::Value,
    pub output_data: serde_json::Value,
}

impl EvaluateRequest {
    /// Parse and validate a request from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse and validate a request from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RequestError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Validate an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RequestError> {
        validate_request_schema(&value).map_err(RequestError::SchemaViolations)?;
        let request: EvaluateRequest = serde_json::from_value(value)?;
        request.validate()?;
        Ok(request)
    }

    /// Read a request file; `.yaml`/`.yml` are parsed as YAML, anything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    /// Semantic checks that the schema cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("workflowId", &self.workflow_id),
            ("workflowName", &self.workflow_name),
            ("platform", &self.platform),
            ("executionId", &self.external_execution_id),
            ("triggeredBy", &self.triggered_by),
            ("nodeId", &self.node_id),
            ("modelName", &self.model_name),
            ("modelProvider", &self.model_provider),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field.to_string()));
            }
        }

        if !self.task.is_known() {
            return Err(ValidationError::UnknownTask);
        }

        if !contains_ignore_case(&SUPPORTED_PLATFORMS, &self.platform) {
            return Err(ValidationError::InvalidValue {
                field: "platform".to_string(),
                reason: format!(
                    "'{}' is not one of: {}",
                    self.platform,
                    SUPPORTED_PLATFORMS.join(", ")
                ),
            });
        }

        if !contains_ignore_case(&SUPPORTED_PROVIDERS, &self.model_provider) {
            return Err(ValidationError::InvalidValue {
                field: "modelProvider".to_string(),
                reason: format!(
                    "'{}' is not one of: {}",
                    self.model_provider,
                    SUPPORTED_PROVIDERS.join(", ")
                ),
            });
        }

        if self.input_data.is_null() {
            return Err(ValidationError::MissingField("inputData".to_string()));
        }
        if self.output_data.is_null() {
            return Err(ValidationError::MissingField("outputData".to_string()));
        }

        Ok(())
    }

    /// Workflow-run identity carried by this request.
    pub fn new_workflow_run(&self) -> NewWorkflowRun {
        NewWorkflowRun {
            platform: self.platform.clone(),
            external_execution_id: self.external_execution_id.clone(),
            external_workflow_id: self.workflow_id.clone(),
            workflow_name: self.workflow_name.clone(),
            triggered_by: self.triggered_by.clone(),
            mode: self.mode,
            session_id: self.session_id.clone(),
        }
    }

    /// Model-run fields carried by this request, attached to `workflow_run_id`.
    pub fn new_model_run(&self, workflow_run_id: uuid::Uuid) -> NewModelRun {
        NewModelRun {
            workflow_run_id,
            platform: self.platform.clone(),
            external_node_id: self.node_id.clone(),
            task: self.task,
            model_name: self.model_name.clone(),
            model_provider: self.model_provider.clone(),
            prompt_version: self.prompt_version.clone(),
            input_data: self.input_data.clone(),
            output_data: self.output_data.clone(),
        }
    }
}

fn contains_ignore_case(allowed: &[&str], value: &str) -> bool {
    allowed.iter().any(|a| a.eq_ignore_ascii_case(value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_REQUEST: &str = r#"{
        "workflowId": "wf-1",
        "workflowName": "Daily digest",
        "platform": "n8n",
        "executionId": "exec-1",
        "triggeredBy": "cron",
        "mode": "Production",
        "sessionId": "sess-1",
        "nodeId": "node-7",
        "task": "summarize",
        "modelName": "gpt-4o",
        "modelProvider": "OpenAI",
        "promptVersion": "v3",
        "inputData": {"text": "long article"},
        "outputData": {"summary": "short"}
    }"#;

    fn with(field: &str, value: serde_json::Value) -> String {
        let mut json: serde_json::Value = serde_json::from_str(VALID_REQUEST).unwrap();
        json[field] = value;
        json.to_string()
    }

    #[test]
    fn test_parse_valid_request() {
        let request = EvaluateRequest::from_json(VALID_REQUEST).unwrap();
        assert_eq!(request.external_execution_id, "exec-1");
        assert_eq!(request.mode, ExecutionMode::Production);
        assert_eq!(request.task, TaskType::Summarize);
        assert_eq!(request.session_id.as_deref(), Some("sess-1"));
    }

    #[test]
    fn test_parse_yaml_request() {
        let yaml = r#"
workflowId: wf-2
workflowName: Translator
platform: Make
externalExecutionId: exec-9
triggeredBy: manual
mode: test
nodeId: node-1
task: Translate
modelName: claude-sonnet
modelProvider: anthropic
inputData: { text: "hola" }
outputData: { text: "hello" }
"#;
        let request = EvaluateRequest::from_yaml(yaml).unwrap();
        assert_eq!(request.external_execution_id, "exec-9");
        assert_eq!(request.prompt_version, None);
    }

    #[test]
    fn test_unknown_task_rejected() {
        let result = EvaluateRequest::from_json(&with("task", serde_json::json!("Unknown")));
        assert!(matches!(
            result,
            Err(RequestError::Invalid(ValidationError::UnknownTask))
        ));
    }

    #[test]
    fn test_unrecognised_task_rejected() {
        let result = EvaluateRequest::from_json(&with("task", serde_json::json!("Poetry")));
        assert!(matches!(result, Err(RequestError::JsonError(_))));
    }

    #[test]
    fn test_unsupported_platform_rejected() {
        let result = EvaluateRequest::from_json(&with("platform", serde_json::json!("cron.sh")));
        assert!(matches!(
            result,
            Err(RequestError::Invalid(ValidationError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_unsupported_provider_rejected() {
        let result = EvaluateRequest::from_json(&with("modelProvider", serde_json::json!("acme")));
        assert!(matches!(
            result,
            Err(RequestError::Invalid(ValidationError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_blank_field_rejected() {
        let result = EvaluateRequest::from_json(&with("nodeId", serde_json::json!("   ")));
        assert!(matches!(
            result,
            Err(RequestError::Invalid(ValidationError::MissingField(ref f))) if f == "nodeId"
        ));
    }

    #[test]
    fn test_schema_violation_reported() {
        let result = EvaluateRequest::from_json(r#"{"platform": "n8n"}"#);
        assert!(matches!(result, Err(RequestError::SchemaViolations(_))));
    }

    #[test]
    fn test_both_execution_id_keys_rejected() {
        let result =
            EvaluateRequest::from_json(&with("externalExecutionId", serde_json::json!("exec-2")));
        assert!(matches!(result, Err(RequestError::SchemaViolations(_))));
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let result = EvaluateRequest::from_json(&with("mode", serde_json::json!("staging")));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_model_run_carries_request_fields() {
        let request = EvaluateRequest::from_json(VALID_REQUEST).unwrap();
        let workflow_run_id = uuid::Uuid::new_v4();
        let new = request.new_model_run(workflow_run_id);
        assert_eq!(new.workflow_run_id, workflow_run_id);
        assert_eq!(new.external_node_id, "node-7");
        assert_eq!(new.prompt_version.as_deref(), Some("v3"));
    }
}
