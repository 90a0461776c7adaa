//! Error types for the notifications domain.

use stream_worker::StreamError;
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

#[derive(Debug, Error)]
pub enum NotificationError {
    /// The mail transport refused or failed the send.
    #[error("Email provider error: {0}")]
    ProviderError(String),

    /// Sender or recipient could not be parsed as a mailbox.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Template rendering error: {0}")]
    TemplateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl NotificationError {
    /// Transport failures may succeed on a later attempt; the rest will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, NotificationError::ProviderError(_))
    }
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::TemplateError(err.to_string())
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        NotificationError::ConfigError(err.to_string())
    }
}

impl From<NotificationError> for StreamError {
    fn from(e: NotificationError) -> Self {
        if e.is_transient() {
            StreamError::transient(e.to_string())
        } else {
            StreamError::permanent(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_worker::ErrorCategory;

    #[test]
    fn test_provider_errors_map_to_transient() {
        let err: StreamError = NotificationError::ProviderError("timeout".into()).into();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }

    #[test]
    fn test_template_errors_map_to_permanent() {
        let err: StreamError = NotificationError::TemplateError("missing".into()).into();
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }
}
