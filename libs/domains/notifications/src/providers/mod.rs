//! The Notification Sink: `EmailProvider` and its implementations.

mod recording;
mod smtp;

pub use recording::RecordingProvider;
pub use smtp::{SmtpConfig, SmtpProvider};

use crate::error::NotificationResult;
use async_trait::async_trait;

/// A send the transport accepted.
#[derive(Debug, Clone)]
pub struct SentEmail {
    /// Transport-specific id, when the server returns one.
    pub message_id: Option<String>,
    pub accepted: bool,
}

/// Email content ready for sending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailContent {
    pub to_email: String,
    /// Display name; empty sends to the bare address.
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

impl EmailContent {
    /// Same message addressed to someone else.
    pub fn addressed_to(&self, to_email: impl Into<String>) -> Self {
        Self {
            to_email: to_email.into(),
            to_name: String::new(),
            ..self.clone()
        }
    }
}

/// Mail transport used by both notification paths.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;

    async fn health_check(&self) -> NotificationResult<bool>;
}
