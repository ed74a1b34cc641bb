//! Slack incoming-webhook channel.

use async_trait::async_trait;

use arbiter_core::ReviewAlert;

use super::{NotificationChannel, NotificationError};

pub struct SlackWebhookChannel {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackWebhookChannel {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

// The webhook URL embeds a token.
impl std::fmt::Debug for SlackWebhookChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackWebhookChannel")
            .field("webhook_url", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl NotificationChannel for SlackWebhookChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn deliver(&self, alert: &ReviewAlert) -> Result<(), NotificationError> {
        if self.webhook_url.is_empty() {
            return Err(NotificationError::NotConfigured(
                "Slack webhook URL is empty".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&alert.chat_payload())
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotificationError::Delivery(format!("Slack returned {}: {}", status, body)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::tests::alert;

    #[test]
    fn test_debug_hides_webhook_token() {
        let channel = SlackWebhookChannel::new("https://hooks.slack.com/services/T0/B0/secret");
        assert!(!format!("{:?}", channel).contains("secret"));
    }

    #[tokio::test]
    async fn test_empty_url_not_configured() {
        let channel = SlackWebhookChannel::new("");
        assert!(matches!(
            channel.deliver(&alert(1.0)).await,
            Err(NotificationError::NotConfigured(_))
        ));
    }
}
