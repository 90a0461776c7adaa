//! Stream error types and error categorization
//!
//! Errors are categorized to decide what the consume loop does with a message:
//! - **Transient**: leave it uncommitted, back off, redeliver
//! - **Permanent**: commit and move on (never retried)
//! - **RateLimited**: like transient, with a longer backoff

use thiserror::Error;

/// Category of error for determining retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure - retry with exponential backoff (1s-30s)
    Transient,
    /// Unrecoverable error - commit without retry
    Permanent,
    /// Rate limit hit - longer backoff (5s-120s)
    RateLimited,
}

impl ErrorCategory {
    /// Get the base delay in milliseconds for this error category
    pub fn base_delay_ms(&self) -> u64 {
        match self {
            ErrorCategory::Transient => 1000,
            ErrorCategory::Permanent => 0,
            ErrorCategory::RateLimited => 5000,
        }
    }

    /// Get the maximum delay in milliseconds for this error category
    pub fn max_delay_ms(&self) -> u64 {
        match self {
            ErrorCategory::Transient => 30_000,
            ErrorCategory::Permanent => 0,
            ErrorCategory::RateLimited => 120_000,
        }
    }

    /// Calculate exponential backoff delay for given retry count
    pub fn backoff_delay_ms(&self, retry_count: u32) -> u64 {
        if *self == ErrorCategory::Permanent {
            return 0;
        }

        let base = self.base_delay_ms();
        let max = self.max_delay_ms();
        let delay = base.saturating_mul(2u64.saturating_pow(retry_count));
        delay.min(max)
    }

    pub fn is_retryable(&self) -> bool {
        *self != ErrorCategory::Permanent
    }

    /// Label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::RateLimited => "rate_limited",
        }
    }
}

/// Stream processing errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Message processing failed
    #[error("Processing error: {message}")]
    Processing {
        message: String,
        category: ErrorCategory,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Fewer replicas acknowledged a write than requested
    #[error("Write acknowledged by {acked} replica(s), {required} required")]
    InsufficientAcks { required: usize, acked: usize },

    /// Operation needs a subscription that has not been made
    #[error("Not subscribed: {0}")]
    NotSubscribed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Shutdown requested
    #[error("Shutdown requested")]
    Shutdown,
}

impl StreamError {
    /// Create a transient processing error
    pub fn transient(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// Create a permanent processing error
    pub fn permanent(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    /// Create a rate limited error
    pub fn rate_limited(message: impl Into<String>) -> Self {
        StreamError::RateLimited(message.into())
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::Redis(_) => ErrorCategory::Transient,
            StreamError::Serialization(_) => ErrorCategory::Permanent,
            StreamError::Processing { category, .. } => *category,
            StreamError::RateLimited(_) => ErrorCategory::RateLimited,
            StreamError::InsufficientAcks { .. } => ErrorCategory::Transient,
            StreamError::NotSubscribed(_) => ErrorCategory::Permanent,
            StreamError::Config(_) => ErrorCategory::Permanent,
            StreamError::Internal(_) => ErrorCategory::Permanent,
            StreamError::Shutdown => ErrorCategory::Permanent,
        }
    }

    /// Check if this error should trigger another attempt
    pub fn should_retry(&self, retry_count: u32, max_retries: u32) -> bool {
        self.category().is_retryable() && retry_count < max_retries
    }

    /// Get the backoff delay for retry
    pub fn backoff_delay_ms(&self, retry_count: u32) -> u64 {
        self.category().backoff_delay_ms(retry_count)
    }

    /// Redis reports a missing consumer group (stream deleted or group destroyed).
    pub fn is_nogroup(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.to_string().contains("NOGROUP"))
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Serialization(err.to_string())
    }
}
