//! JSON Schema validation for evaluation requests.
//!
//! Requests are checked against `schema/evaluate-request.schema.json` before
//! they are decoded, so structural problems are reported together instead of
//! one serde error at a time.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded request schema (loaded at compile time).
const REQUEST_SCHEMA_JSON: &str = include_str!("../../schema/evaluate-request.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(REQUEST_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// Validate a request JSON value against the schema.
///
/// Returns every violation as `"<message> at <path>"`.
pub fn validate_request_schema(request_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(request_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> serde_json::Value {
        serde_json::json!({
            "workflowId": "wf-1",
            "workflowName": "Daily digest",
            "platform": "n8n",
            "executionId": "exec-1",
            "triggeredBy": "cron",
            "mode": "production",
            "nodeId": "node-7",
            "task": "Summarize",
            "modelName": "gpt-4o",
            "modelProvider": "openai",
            "inputData": {"text": "long article"},
            "outputData": {"summary": "short"}
        })
    }

    #[test]
    fn test_valid_request_passes_schema() {
        assert!(validate_request_schema(&valid()).is_ok());
    }

    #[test]
    fn test_external_execution_id_alias_passes() {
        let mut value = valid();
        let id = value.as_object_mut().unwrap().remove("executionId").unwrap();
        value["externalExecutionId"] = id;
        assert!(validate_request_schema(&value).is_ok());
    }

    #[test]
    fn test_both_execution_id_keys_fail() {
        let mut value = valid();
        value["externalExecutionId"] = serde_json::json!("exec-2");
        assert!(validate_request_schema(&value).is_err());
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let value = serde_json::json!({ "workflowId": "wf-1" });
        let errors = validate_request_schema(&value).unwrap_err();
        assert!(errors.len() > 1);
    }

    #[test]
    fn test_null_output_fails() {
        let mut value = valid();
        value["outputData"] = serde_json::Value::Null;
        assert!(validate_request_schema(&value).is_err());
    }

    #[test]
    fn test_empty_string_fails() {
        let mut value = valid();
        value["workflowName"] = serde_json::json!("");
        assert!(validate_request_schema(&value).is_err());
    }
}
