//! Consumer and producer configuration
//!
//! `WorkerConfig` drives the subscriber and the consume loop, `ProducerConfig`
//! drives durable publishing. Both are plain builders; binaries fill them
//! from the environment.

use crate::registry::StreamDef;
use std::time::Duration;
use uuid::Uuid;

/// Configuration for the consume side
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Redis stream key (topic)
    pub stream_name: String,

    /// Consumer group name
    pub consumer_group: String,

    /// Consumer name within the group
    pub consumer_name: String,

    /// Upper bound on a single blocking read, in milliseconds
    pub poll_timeout_ms: u64,

    /// First pause after a broker-level error; doubles up to `max_error_backoff_ms`
    pub error_backoff_ms: u64,

    /// Ceiling for the broker error backoff
    pub max_error_backoff_ms: u64,

    /// Entries idle longer than this in another consumer's pending list get claimed
    pub claim_idle_ms: u64,

    /// How many abandoned entries one claim pass takes over
    pub claim_batch: usize,
}

impl WorkerConfig {
    /// Create a new WorkerConfig from a StreamDef
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self::new(S::STREAM_NAME, S::CONSUMER_GROUP)
    }

    /// Create a new WorkerConfig with explicit values
    pub fn new(stream_name: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            consumer_group: consumer_group.into(),
            consumer_name: format!("worker-{}", Uuid::new_v4()),
            poll_timeout_ms: 1000,
            error_backoff_ms: 5000,
            max_error_backoff_ms: 30_000,
            claim_idle_ms: 30_000,
            claim_batch: 100,
        }
    }

    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    pub fn with_poll_timeout_ms(mut self, timeout: u64) -> Self {
        // XREADGROUP BLOCK 0 waits forever
        self.poll_timeout_ms = timeout.max(1);
        self
    }

    pub fn with_error_backoff_ms(mut self, backoff: u64) -> Self {
        self.error_backoff_ms = backoff;
        self
    }

    pub fn with_max_error_backoff_ms(mut self, backoff: u64) -> Self {
        self.max_error_backoff_ms = backoff;
        self
    }

    pub fn with_claim_idle_ms(mut self, idle: u64) -> Self {
        self.claim_idle_ms = idle;
        self
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Backoff after `consecutive_errors` broker failures in a row (1-based).
    pub fn error_backoff(&self, consecutive_errors: u32) -> Duration {
        let exp = consecutive_errors.saturating_sub(1).min(16);
        let delay = self
            .error_backoff_ms
            .saturating_mul(2u64.saturating_pow(exp))
            .min(self.max_error_backoff_ms.max(self.error_backoff_ms));
        Duration::from_millis(delay)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new("meeting-created", "utility-service-group")
    }
}

/// Replica acknowledgment required before a publish reports success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acks {
    /// The primary's reply is enough.
    Leader,
    /// Wait until `min_replicas` replicas have the write (`WAIT`).
    All { min_replicas: usize },
}

/// Configuration for the publish side
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Maximum stream length before trimming (MAXLEN ~)
    pub max_length: i64,

    /// Durability level
    pub acks: Acks,

    /// How long `WAIT` may block, in milliseconds
    pub ack_timeout_ms: u64,

    /// Extra attempts for a transient failure (same idempotency key)
    pub max_retries: u32,

    /// Lifetime of the idempotency marker, in seconds
    pub dedup_ttl_secs: u64,
}

impl ProducerConfig {
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self {
            max_length: S::MAX_LENGTH,
            ..Self::default()
        }
    }

    pub fn with_max_length(mut self, max_length: i64) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_acks(mut self, acks: Acks) -> Self {
        self.acks = acks;
        self
    }

    pub fn with_ack_timeout_ms(mut self, timeout: u64) -> Self {
        self.ack_timeout_ms = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_dedup_ttl_secs(mut self, ttl: u64) -> Self {
        self.dedup_ttl_secs = ttl.max(1);
        self
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_length: 100_000,
            acks: Acks::All { min_replicas: 0 },
            ack_timeout_ms: 1000,
            max_retries: 3,
            dedup_ttl_secs: 86_400,
        }
    }
}
