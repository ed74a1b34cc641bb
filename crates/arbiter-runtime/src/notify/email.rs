//! Email notification channel.
//!
//! Message rendering lives here; sending is delegated to an
//! [`EmailTransport`]. The bundled [`LogTransport`] only records the message
//! through `tracing`, which is what deployments without an SMTP relay get.

use async_trait::async_trait;
use std::sync::Arc;

use arbiter_core::ReviewAlert;

use super::{NotificationChannel, NotificationError};

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError>;
}

/// Logs messages instead of sending them.
#[derive(Debug, Clone)]
pub struct LogTransport {
    smtp_host: String,
    smtp_port: u16,
}

impl LogTransport {
    pub fn new(smtp_host: impl Into<String>, smtp_port: u16) -> Self {
        Self {
            smtp_host: smtp_host.into(),
            smtp_port,
        }
    }
}

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            smtp_host = %self.smtp_host,
            smtp_port = self.smtp_port,
            from = %message.from,
            to = ?message.to,
            subject = %message.subject,
            "Email notification recorded"
        );
        tracing::debug!(body = %message.body, "Email notification body");
        Ok(())
    }
}

pub struct EmailChannel {
    from: String,
    to: Vec<String>,
    transport: Arc<dyn EmailTransport>,
}

impl EmailChannel {
    pub fn new(from: impl Into<String>, to: Vec<String>, transport: Arc<dyn EmailTransport>) -> Self {
        Self {
            from: from.into(),
            to,
            transport,
        }
    }

    pub fn render(&self, alert: &ReviewAlert) -> EmailMessage {
        EmailMessage {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: alert.email_subject(),
            body: alert.email_body(),
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, alert: &ReviewAlert) -> Result<(), NotificationError> {
        if self.to.is_empty() {
            return Err(NotificationError::NotConfigured(
                "email channel has no recipients".to_string(),
            ));
        }
        self.transport.send(&self.render(alert)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::tests::alert;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingTransport {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailTransport for CapturingTransport {
        async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
            self.sent.lock().push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_renders_and_sends() {
        let transport = Arc::new(CapturingTransport::default());
        let channel = EmailChannel::new(
            "arbiter@example.com",
            vec!["review@example.com".to_string()],
            transport.clone(),
        );

        channel.deliver(&alert(2.5)).await.unwrap();

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("2.5/5.0"));
        assert!(sent[0].body.contains("Workflow: Digest"));
    }

    #[tokio::test]
    async fn test_no_recipients_is_not_configured() {
        let channel = EmailChannel::new("a@example.com", vec![], Arc::new(LogTransport::new("smtp", 25)));
        assert!(matches!(
            channel.deliver(&alert(1.0)).await,
            Err(NotificationError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_log_transport_always_succeeds() {
        let transport = LogTransport::new("smtp.example.com", 587);
        let message = EmailMessage {
            from: "a@example.com".to_string(),
            to: vec!["b@example.com".to_string()],
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        assert!(transport.send(&message).await.is_ok());
    }
}
