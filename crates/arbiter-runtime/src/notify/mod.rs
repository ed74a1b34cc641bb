//! Best-effort human-review notifications.
//!
//! When a score falls below the human-feedback threshold the gate tries each
//! channel in order and stops at the first success. Delivery runs on a
//! spawned task, is bounded per channel by a timeout, is never retried, and
//! never affects the evaluation it reports on.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use arbiter_core::{NotificationPolicy, ReviewAlert};

use crate::config::NotificationConfig;

mod email;
#[cfg(feature = "webhook")]
mod slack;

pub use email::{EmailChannel, EmailMessage, EmailTransport, LogTransport};
#[cfg(feature = "webhook")]
pub use slack::SlackWebhookChannel;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("channel not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, alert: &ReviewAlert) -> Result<(), NotificationError>;
}

/// Result of one channel attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChannelAttempt {
    Delivered { channel: String },
    Failed { channel: String, error: String },
}

/// Everything that happened while delivering one alert.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryReport {
    pub attempts: Vec<ChannelAttempt>,
}

impl DeliveryReport {
    /// The channel that accepted the alert, if any.
    pub fn delivered_via(&self) -> Option<&str> {
        self.attempts.iter().find_map(|a| match a {
            ChannelAttempt::Delivered { channel } => Some(channel.as_str()),
            ChannelAttempt::Failed { .. } => None,
        })
    }

    pub fn is_delivered(&self) -> bool {
        self.delivered_via().is_some()
    }
}

/// Escalation policy plus the ordered channel list.
#[derive(Clone)]
pub struct NotificationGate {
    policy: NotificationPolicy,
    channels: Vec<Arc<dyn NotificationChannel>>,
    channel_timeout: Duration,
}

impl NotificationGate {
    pub fn new(policy: NotificationPolicy, channel_timeout: Duration) -> Self {
        Self {
            policy,
            channels: Vec::new(),
            channel_timeout,
        }
    }

    /// Build the gate and its channels from configuration: chat webhook
    /// first, then email.
    pub fn from_config(config: &NotificationConfig) -> Self {
        #[allow(unused_mut)]
        let mut gate = Self::new(config.policy(), config.channel_timeout);

        if let Some(url) = &config.slack_webhook_url {
            #[cfg(feature = "webhook")]
            {
                gate = gate.channel(Arc::new(SlackWebhookChannel::new(url.clone())));
            }
            #[cfg(not(feature = "webhook"))]
            tracing::warn!(
                url_configured = !url.is_empty(),
                "Slack webhook configured but this build lacks the 'webhook' feature"
            );
        }

        if let Some(email) = &config.email {
            gate = gate.channel(Arc::new(EmailChannel::new(
                email.from.clone(),
                email.to.clone(),
                Arc::new(LogTransport::new(email.smtp_host.clone(), email.smtp_port)),
            )));
        }

        gate
    }

    /// Append a channel; channels are tried in insertion order.
    pub fn channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    pub fn threshold(&self) -> f64 {
        self.policy.human_feedback_threshold
    }

    pub fn should_notify(&self, score: f64) -> bool {
        self.policy.should_notify(score)
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Deliver in the background. Returns `None` when the score does not
    /// warrant review or notifications are disabled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, alert: ReviewAlert) -> Option<JoinHandle<DeliveryReport>> {
        if !self.should_notify(alert.evaluation.score()) {
            return None;
        }

        let channels = self.channels.clone();
        let timeout = self.channel_timeout;
        Some(tokio::spawn(async move {
            deliver_in_order(&channels, &alert, timeout).await
        }))
    }

    /// Deliver inline, ignoring the policy.
    pub async fn deliver(&self, alert: &ReviewAlert) -> DeliveryReport {
        deliver_in_order(&self.channels, alert, self.channel_timeout).await
    }
}

impl std::fmt::Debug for NotificationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationGate")
            .field("policy", &self.policy)
            .field("channels", &self.channel_names())
            .field("channel_timeout", &self.channel_timeout)
            .finish()
    }
}

async fn deliver_in_order(
    channels: &[Arc<dyn NotificationChannel>],
    alert: &ReviewAlert,
    timeout: Duration,
) -> DeliveryReport {
    let evaluation_id = alert.evaluation.id();
    let mut report = DeliveryReport::default();

    if channels.is_empty() {
        tracing::warn!(%evaluation_id, "No notification channels configured");
        return report;
    }

    for channel in channels {
        let name = channel.name().to_string();
        let result = match tokio::time::timeout(timeout, channel.deliver(alert)).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout(timeout)),
        };

        match result {
            Ok(()) => {
                tracing::info!(%evaluation_id, channel = %name, "Human review notification sent");
                report.attempts.push(ChannelAttempt::Delivered { channel: name });
                return report;
            }
            Err(e) => {
                tracing::warn!(%evaluation_id, channel = %name, error = %e, "Notification channel failed");
                report.attempts.push(ChannelAttempt::Failed {
                    channel: name,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::warn!(%evaluation_id, "All notification channels failed");
    report
}
