//! Mailer implementations.
//!
//! - `SmtpMailer`: lettre SMTP relay (feature `smtp`)
//! - `LogMailer`: writes notifications to the log when SMTP is not configured
//! - `RecordingMailer`: keeps sent messages in memory (tests)

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::MailConfig;
use crate::interfaces::{EmailMessage, MailError, Mailer};

#[cfg(feature = "smtp")]
mod smtp;

#[cfg(feature = "smtp")]
pub use smtp::SmtpMailer;

/// Create a mailer from configuration.
///
/// An empty SMTP host selects [`LogMailer`].
pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    if config.smtp_host.is_empty() {
        info!("Mail: SMTP host not configured, notifications will be logged");
        return Ok(Arc::new(LogMailer));
    }

    #[cfg(feature = "smtp")]
    {
        Ok(Arc::new(SmtpMailer::new(config)?))
    }
    #[cfg(not(feature = "smtp"))]
    {
        tracing::warn!("SMTP configured but 'smtp' feature is not enabled, notifications will be logged");
        Ok(Arc::new(LogMailer))
    }
}

/// Mailer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Notification (not sent, SMTP disabled)"
        );
        Ok(())
    }
}

/// Mailer that records every message.
#[derive(Default)]
pub struct RecordingMailer {
    sent: RwLock<Vec<EmailMessage>>,
    fail: RwLock<bool>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if *self.fail.read().await {
            return Err(MailError::Delivery("simulated failure".to_string()));
        }
        self.sent.write().await.push(message);
        Ok(())
    }
}
