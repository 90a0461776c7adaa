//! In-process provider that records sends instead of delivering them.
//!
//! Used by tests and by local runs without an SMTP server. Addresses passed to
//! `failing_for` get a `ProviderError` (the attempt is still recorded).

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::info;

#[derive(Default)]
pub struct RecordingProvider {
    sent: Mutex<Vec<EmailContent>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every send to `address`.
    pub fn failing_for(self, address: impl Into<String>) -> Self {
        self.set_failing(address, true);
        self
    }

    pub fn set_failing(&self, address: impl Into<String>, failing: bool) {
        let mut set = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        let address = address.into();
        if failing {
            set.insert(address);
        } else {
            set.remove(&address);
        }
    }

    /// Every attempted send, in call order.
    pub fn sent(&self) -> Vec<EmailContent> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|e| e.to_email).collect()
    }
}

#[async_trait]
impl EmailProvider for RecordingProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(email.clone());

        let fails = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&email.to_email);
        if fails {
            return Err(NotificationError::ProviderError(format!(
                "simulated failure for {}",
                email.to_email
            )));
        }

        info!(to = %email.to_email, subject = %email.subject, "Recorded email");
        Ok(SentEmail {
            message_id: None,
            accepted: true,
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(true)
    }
}
