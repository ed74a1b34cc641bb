//! Grader API keys.
//!
//! A provider describes each key it needs with a [`KeyLookup`]: the field in
//! its `grader.provider_config` block and the environment variable to fall
//! back on. The loaded value sits in a [`secrecy::SecretString`] and is only
//! exposed where the HTTP header is set.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::ProviderError;

/// Where a grader key came from. Safe to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Config,
    Environment,
    Inline,
}

pub struct ApiCredential {
    value: SecretString,
    source: KeySource,
    label: &'static str,
}

impl ApiCredential {
    /// A key handed over in code, e.g. by tests or an embedding service.
    pub fn inline(value: impl Into<String>, label: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source: KeySource::Inline,
            label,
        }
    }

    /// The raw value. Call only where the key is sent.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> KeySource {
        self.source
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("label", &self.label)
            .field("source", &self.source)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// One key a grading provider reads: config field first, then environment.
#[derive(Debug, Clone, Copy)]
pub struct KeyLookup {
    pub field: &'static str,
    pub env_var: &'static str,
    pub label: &'static str,
}

impl KeyLookup {
    pub const fn new(field: &'static str, env_var: &'static str, label: &'static str) -> Self {
        Self {
            field,
            env_var,
            label,
        }
    }

    /// Whether [`KeyLookup::require`] would succeed, without loading the key.
    pub fn is_available(&self, config: &JsonValue) -> bool {
        config[self.field].as_str().is_some() || std::env::var(self.env_var).is_ok()
    }

    pub fn require(&self, config: &JsonValue) -> Result<ApiCredential, ProviderError> {
        self.optional(config).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "{} required: set '{}' in config or {} environment variable",
                self.label, self.field, self.env_var
            ))
        })
    }

    pub fn optional(&self, config: &JsonValue) -> Option<ApiCredential> {
        if let Some(value) = config[self.field].as_str() {
            return Some(self.loaded(value, KeySource::Config));
        }
        std::env::var(self.env_var)
            .ok()
            .map(|value| self.loaded(value, KeySource::Environment))
    }

    /// Environment only, for providers built without a config block.
    pub fn from_env(&self) -> Result<ApiCredential, ProviderError> {
        std::env::var(self.env_var)
            .map(|value| self.loaded(value, KeySource::Environment))
            .map_err(|_| {
                ProviderError::NotConfigured(format!("{} not set: export {}", self.label, self.env_var))
            })
    }

    fn loaded(&self, value: impl Into<String>, source: KeySource) -> ApiCredential {
        ApiCredential {
            value: SecretString::from(value.into()),
            source,
            label: self.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "sk-grader-secret-98765";

    #[test]
    fn test_debug_redacts_key() {
        let cred = ApiCredential::inline(SECRET, "Grader key");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(cred.expose(), SECRET);
    }

    #[test]
    fn test_config_beats_environment() {
        let lookup = KeyLookup::new("api_key", "ARBITER_TEST_KEY_PRIORITY", "Test key");
        std::env::set_var(lookup.env_var, "env-key");
        let cred = lookup
            .require(&serde_json::json!({"api_key": "config-key"}))
            .unwrap();
        std::env::remove_var(lookup.env_var);

        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), KeySource::Config);
    }

    #[test]
    fn test_environment_fallback() {
        let lookup = KeyLookup::new("api_key", "ARBITER_TEST_KEY_FALLBACK", "Test key");
        std::env::set_var(lookup.env_var, "env-key");
        let cred = lookup.require(&serde_json::json!({})).unwrap();
        let direct = lookup.from_env().unwrap();
        std::env::remove_var(lookup.env_var);

        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), KeySource::Environment);
        assert_eq!(direct.expose(), "env-key");
    }

    #[test]
    fn test_missing_key_names_both_sources() {
        let lookup = KeyLookup::new("api_key", "ARBITER_TEST_KEY_ABSENT", "Test key");
        let config = serde_json::json!({});

        assert!(!lookup.is_available(&config));
        assert!(lookup.optional(&config).is_none());
        let err = lookup.require(&config).unwrap_err().to_string();
        assert!(err.contains("api_key"));
        assert!(err.contains("ARBITER_TEST_KEY_ABSENT"));
        assert!(lookup.from_env().is_err());
    }
}
