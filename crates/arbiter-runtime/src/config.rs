//! Runtime configuration.
//!
//! Loaded from YAML; every field has a default so an empty file is valid.
//! Durations are written as human-readable strings (`"30s"`, `"1m 30s"`).
//! A handful of `ARBITER_*` environment variables override the file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use arbiter_core::notification::{NotificationPolicy, DEFAULT_HUMAN_FEEDBACK_THRESHOLD};

pub const ENV_GRADER_PROVIDER: &str = "ARBITER_GRADER_PROVIDER";
pub const ENV_GRADER_MODEL: &str = "ARBITER_GRADER_MODEL";
pub const ENV_GRADER_TIMEOUT: &str = "ARBITER_GRADER_TIMEOUT";
pub const ENV_HUMAN_FEEDBACK_THRESHOLD: &str = "ARBITER_HUMAN_FEEDBACK_THRESHOLD";
pub const ENV_NOTIFICATIONS_ENABLED: &str = "ARBITER_NOTIFICATIONS_ENABLED";
pub const ENV_SLACK_WEBHOOK_URL: &str = "ARBITER_SLACK_WEBHOOK_URL";

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Recorded on every evaluation.
    pub evaluator_type: String,
    pub grader: GraderConfig,
    pub notification: NotificationConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            evaluator_type: "llm".to_string(),
            grader: GraderConfig::default(),
            notification: NotificationConfig::default(),
        }
    }
}

/// Grading model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Provider type registered in the [`crate::providers::ProviderRegistry`].
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,
    /// Passed to the provider factory (`api_key`, `base_url`, ...).
    pub provider_config: serde_json::Value,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-5-20250514".to_string(),
            max_tokens: 500,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
            provider_config: serde_json::json!({}),
        }
    }
}

/// Human-review escalation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub human_feedback_threshold: f64,
    /// Upper bound on one delivery attempt per channel.
    #[serde(with = "humantime_duration")]
    pub channel_timeout: Duration,
    pub slack_webhook_url: Option<String>,
    pub email: Option<EmailConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            human_feedback_threshold: DEFAULT_HUMAN_FEEDBACK_THRESHOLD,
            channel_timeout: Duration::from_secs(10),
            slack_webhook_url: None,
            email: None,
        }
    }
}

impl NotificationConfig {
    pub fn policy(&self) -> NotificationPolicy {
        NotificationPolicy {
            enabled: self.enabled,
            human_feedback_threshold: self.human_feedback_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
}

fn default_smtp_port() -> u16 {
    587
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

impl RuntimeConfig {
    /// Parse YAML without applying environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file, then apply environment overrides.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: RuntimeConfig = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = RuntimeConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ARBITER_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup(ENV_GRADER_PROVIDER) {
            self.grader.provider = provider;
        }
        if let Some(model) = lookup(ENV_GRADER_MODEL) {
            self.grader.model = model;
        }
        if let Some(timeout) = lookup(ENV_GRADER_TIMEOUT) {
            self.grader.timeout = humantime::parse_duration(&timeout)
                .map_err(|e| ConfigError::invalid(ENV_GRADER_TIMEOUT, e.to_string()))?;
        }
        if let Some(threshold) = lookup(ENV_HUMAN_FEEDBACK_THRESHOLD) {
            self.notification.human_feedback_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_HUMAN_FEEDBACK_THRESHOLD, "expected a number"))?;
        }
        if let Some(enabled) = lookup(ENV_NOTIFICATIONS_ENABLED) {
            self.notification.enabled = parse_bool(&enabled)
                .ok_or_else(|| ConfigError::invalid(ENV_NOTIFICATIONS_ENABLED, "expected true or false"))?;
        }
        if let Some(url) = lookup(ENV_SLACK_WEBHOOK_URL) {
            self.notification.slack_webhook_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.evaluator_type.trim().is_empty() {
            return Err(ConfigError::invalid("evaluator_type", "must not be empty"));
        }
        if self.grader.timeout.is_zero() {
            return Err(ConfigError::invalid("grader.timeout", "must be greater than zero"));
        }
        if self.notification.channel_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "notification.channel_timeout",
                "must be greater than zero",
            ));
        }
        if !self.notification.human_feedback_threshold.is_finite() {
            return Err(ConfigError::invalid(
                "notification.human_feedback_threshold",
                "must be a finite number",
            ));
        }
        if let Some(url) = &self.notification.slack_webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::invalid(
                    "notification.slack_webhook_url",
                    "must start with http:// or https://",
                ));
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.evaluator_type, "llm");
        assert_eq!(config.grader.timeout, Duration::from_secs(30));
        assert!(config.notification.enabled);
        assert_eq!(config.notification.human_feedback_threshold, 3.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = RuntimeConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_yaml_with_humantime_durations() {
        let yaml = r#"
evaluator_type: llm
grader:
  provider: openai
  model: gpt-4o
  timeout: 1m 30s
notification:
  human_feedback_threshold: 2.5
  channel_timeout: 5s
  slack_webhook_url: https://hooks.slack.com/services/T/B/X
  email:
    smtp_host: smtp.example.com
    from: arbiter@example.com
    to: [reviewers@example.com]
"#;
        let config = RuntimeConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.grader.provider, "openai");
        assert_eq!(config.grader.timeout, Duration::from_secs(90));
        assert_eq!(config.notification.channel_timeout, Duration::from_secs(5));
        assert_eq!(config.notification.human_feedback_threshold, 2.5);
        let email = config.notification.email.unwrap();
        assert_eq!(email.smtp_port, 587);
        assert_eq!(email.to, vec!["reviewers@example.com"]);
    }

    #[test]
    fn test_bad_duration_rejected() {
        let yaml = "grader:\n  timeout: soon\n";
        assert!(matches!(RuntimeConfig::from_yaml(yaml), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let yaml = "grader:\n  timeout: 0s\n";
        assert!(matches!(
            RuntimeConfig::from_yaml(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_GRADER_MODEL, "claude-haiku"),
            (ENV_GRADER_TIMEOUT, "45s"),
            (ENV_HUMAN_FEEDBACK_THRESHOLD, "4.0"),
            (ENV_NOTIFICATIONS_ENABLED, "false"),
        ]);
        let mut config = RuntimeConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.grader.model, "claude-haiku");
        assert_eq!(config.grader.timeout, Duration::from_secs(45));
        assert_eq!(config.notification.human_feedback_threshold, 4.0);
        assert!(!config.notification.policy().enabled);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = RuntimeConfig::default();
        let result = config.apply_overrides(|key| {
            (key == ENV_HUMAN_FEEDBACK_THRESHOLD).then(|| "high".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_non_http_webhook_rejected() {
        let mut config = RuntimeConfig::default();
        config.notification.slack_webhook_url = Some("ftp://example.com".to_string());
        assert!(config.validate().is_err());
    }
}
