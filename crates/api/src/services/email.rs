//! Notification email delivery.
//!
//! Only the `console` provider is built in: messages are written to the log
//! instead of leaving the process.

use crate::config::EmailConfig;
use domain::services::{DeliveryResult, EmailChannel};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Email delivery errors.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Unknown email provider: {0}")]
    UnknownProvider(String),
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_text: String,
}

/// Email channel backed by the configured provider.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
}

impl EmailService {
    /// Creates the service from the email config section.
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Whether delivery is switched on.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Sends a message through the configured provider. Returns `Ok(false)`
    /// when sending is disabled.
    pub async fn deliver(&self, message: EmailMessage) -> Result<bool, EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(false);
        }

        if !message.to.contains('@') {
            return Err(EmailError::InvalidAddress(message.to));
        }

        match self.config.provider.as_str() {
            "console" => {
                info!(
                    from = %self.config.sender_email,
                    from_name = %self.config.sender_name,
                    to = %message.to,
                    subject = %message.subject,
                    body = %message.body_text,
                    "Console email"
                );
                Ok(true)
            }
            provider => Err(EmailError::UnknownProvider(provider.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl EmailChannel for EmailService {
    async fn send(&self, to: &str, subject: &str, body: &str) -> DeliveryResult {
        let message = EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body_text: body.to_string(),
        };
        match self.deliver(message).await {
            Ok(true) => DeliveryResult::Sent,
            Ok(false) => DeliveryResult::Skipped,
            Err(e) => {
                error!(to = %to, error = %e, "Failed to send notification email");
                DeliveryResult::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(enabled: bool, provider: &str) -> EmailService {
        EmailService::new(EmailConfig {
            enabled,
            provider: provider.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_disabled_service_skips() {
        let result = service(false, "console").send("ana@example.rs", "s", "b").await;
        assert_eq!(result, DeliveryResult::Skipped);
    }

    #[tokio::test]
    async fn test_console_provider_sends() {
        let result = service(true, "console").send("ana@example.rs", "s", "b").await;
        assert_eq!(result, DeliveryResult::Sent);
    }

    #[tokio::test]
    async fn test_unknown_provider_fails() {
        let result = service(true, "smtp").send("ana@example.rs", "s", "b").await;
        assert!(matches!(result, DeliveryResult::Failed(msg) if msg.contains("smtp")));
    }

    #[tokio::test]
    async fn test_invalid_address_fails() {
        let result = service(true, "console").send("nobody", "s", "b").await;
        assert!(matches!(result, DeliveryResult::Failed(_)));
    }
}
