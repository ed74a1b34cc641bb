//! Graders produce the raw judgment text that the score extractor reads.
//!
//! A grader only returns text. Turning that text into a score, and turning
//! a failed call into a degraded score, happens in the orchestrator.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use arbiter_core::TaskType;

use crate::providers::ProviderError;

mod llm;

pub use llm::LlmGrader;

#[derive(Error, Debug)]
pub enum GraderError {
    #[error("grader provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("grader timed out after {0:?}")]
    Timeout(Duration),

    #[error("grader not configured: {0}")]
    NotConfigured(String),
}

/// What a grader is asked to judge.
#[derive(Debug, Clone, Copy)]
pub struct GradingInput<'a> {
    pub task: TaskType,
    pub model_name: &'a str,
    pub platform: &'a str,
    pub input: &'a serde_json::Value,
    pub output: &'a serde_json::Value,
}

#[async_trait]
pub trait Grader: Send + Sync {
    /// Raw judgment text. May be empty or free-form.
    async fn grade(&self, input: &GradingInput<'_>) -> Result<String, GraderError>;

    fn name(&self) -> &str;
}

/// Returns the same text for every request. Used offline and in tests.
#[derive(Debug, Clone)]
pub struct FixedResponseGrader {
    response: String,
}

impl FixedResponseGrader {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Grader for FixedResponseGrader {
    async fn grade(&self, _input: &GradingInput<'_>) -> Result<String, GraderError> {
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_response_grader() {
        let grader = FixedResponseGrader::new("rating: 4");
        let input = serde_json::json!({});
        let output = serde_json::json!({});
        let text = grader
            .grade(&GradingInput {
                task: TaskType::Draft,
                model_name: "gpt-4o",
                platform: "n8n",
                input: &input,
                output: &output,
            })
            .await
            .unwrap();
        assert_eq!(text, "rating: 4");
    }

    #[test]
    fn test_grader_error_messages() {
        let err = GraderError::from(ProviderError::AuthError);
        assert_eq!(err.to_string(), "grader provider failed: Authentication failed");
        assert!(GraderError::Timeout(Duration::from_secs(30)).to_string().contains("30s"));
    }
}
