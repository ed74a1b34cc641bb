//! Grader backed by an LLM provider.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Grader, GraderError, GradingInput};
use crate::config::GraderConfig;
use crate::prompts::{grading_prompt, GRADER_SYSTEM_PROMPT};
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderRegistry};

pub struct LlmGrader {
    provider: Arc<dyn LlmProvider>,
    completion: CompletionConfig,
}

impl LlmGrader {
    pub fn new(provider: Arc<dyn LlmProvider>, completion: CompletionConfig) -> Self {
        Self {
            provider,
            completion,
        }
    }

    /// Create the configured provider through the registry.
    pub fn from_config(
        config: &GraderConfig,
        registry: &ProviderRegistry,
    ) -> Result<Self, GraderError> {
        if !registry.has_provider(&config.provider) {
            return Err(GraderError::NotConfigured(format!(
                "provider '{}' is not available in this build (available: {:?})",
                config.provider,
                registry.available_types()
            )));
        }
        let provider = registry.create(&config.provider, &config.provider_config)?;
        Ok(Self::new(provider, CompletionConfig::from(config)))
    }

    fn messages(input: &GradingInput<'_>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(GRADER_SYSTEM_PROMPT),
            ChatMessage::user(grading_prompt(
                input.task,
                input.model_name,
                input.platform,
                input.input,
                input.output,
            )),
        ]
    }
}

#[async_trait]
impl Grader for LlmGrader {
    async fn grade(&self, input: &GradingInput<'_>) -> Result<String, GraderError> {
        let response = self
            .provider
            .complete(Self::messages(input), &self.completion)
            .await?;

        tracing::debug!(
            provider = self.provider.name(),
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Grader call completed"
        );

        Ok(response.content)
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}
