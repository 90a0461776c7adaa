//! Best-effort hand-off of `MeetingCreatedEvent` to the broker.
//!
//! With no broker configured publishing is skipped. A failed publish is
//! reported back to the caller and never retried here; the producer already
//! retries transient errors under one idempotency key.

use std::sync::Arc;

use core_config::{ConfigError, env_optional, env_parse};
use database::RetryConfig;
use domain_notifications::{MeetingCreatedEvent, MeetingCreatedStream};
use stream_worker::{Acks, EventPublisher, ProducerConfig, StreamDef, StreamProducer, publish_event};
use tracing::{debug, info, warn};

use crate::error::{MeetingError, MeetingResult};

/// Producer settings from the environment:
/// - `PRODUCER_MIN_REPLICAS` (default 0)
/// - `PRODUCER_ACK_TIMEOUT_MS` (default 1000)
/// - `PRODUCER_MAX_RETRIES` (default 3)
/// - `PRODUCER_DEDUP_TTL_SECS` (default 86400)
/// - `PRODUCER_MAX_LENGTH` (default 100000)
pub fn producer_config_from_env() -> Result<ProducerConfig, ConfigError> {
    Ok(ProducerConfig::from_stream_def::<MeetingCreatedStream>()
        .with_acks(Acks::All {
            min_replicas: env_parse("PRODUCER_MIN_REPLICAS", 0usize)?,
        })
        .with_ack_timeout_ms(env_parse("PRODUCER_ACK_TIMEOUT_MS", 1000u64)?)
        .with_max_retries(env_parse("PRODUCER_MAX_RETRIES", 3u32)?)
        .with_dedup_ttl_secs(env_parse("PRODUCER_DEDUP_TTL_SECS", 86_400u64)?)
        .with_max_length(env_parse("PRODUCER_MAX_LENGTH", 100_000i64)?))
}

/// What happened to one publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { message_id: String },
    /// No broker configured
    Skipped,
    Failed(String),
}

#[derive(Clone)]
pub struct MeetingEventPublisher {
    publisher: Option<Arc<dyn EventPublisher>>,
    topic: String,
}

impl MeetingEventPublisher {
    pub fn new(publisher: Arc<dyn EventPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher: Some(publisher),
            topic: topic.into(),
        }
    }

    /// A publisher that skips every event.
    pub fn disabled() -> Self {
        Self {
            publisher: None,
            topic: MeetingCreatedStream::stream_name().to_string(),
        }
    }

    /// Topic from `MEETING_CREATED_TOPIC` (default `meeting-created`).
    pub fn from_env(publisher: Option<Arc<dyn EventPublisher>>) -> Self {
        Self {
            publisher,
            topic: core_config::env_or_default(
                "MEETING_CREATED_TOPIC",
                MeetingCreatedStream::stream_name(),
            ),
        }
    }

    /// Connect to `BROKER_URL`, or return a disabled publisher when it is unset.
    pub async fn connect_from_env() -> MeetingResult<Self> {
        let Some(url) = env_optional("BROKER_URL") else {
            warn!("BROKER_URL not set, meeting-created events will not be published");
            return Ok(Self::disabled());
        };

        let config = producer_config_from_env()?;
        let redis = database::redis::connect_with_retry(&url, RetryConfig::startup())
            .await
            .map_err(|e| MeetingError::Broker(e.to_string()))?;

        let publisher = Self::from_env(Some(Arc::new(StreamProducer::new(redis, config))));
        info!(topic = %publisher.topic, "Meeting-created publishing enabled");
        Ok(publisher)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_enabled(&self) -> bool {
        self.publisher.is_some()
    }

    pub async fn publish(&self, event: &MeetingCreatedEvent) -> PublishOutcome {
        let Some(publisher) = &self.publisher else {
            debug!(meeting_id = event.meeting_id, "No broker configured, skipping publish");
            return PublishOutcome::Skipped;
        };

        match publish_event(publisher.as_ref(), &self.topic, event).await {
            Ok(ack) => PublishOutcome::Published {
                message_id: ack.message_id,
            },
            Err(e) => PublishOutcome::Failed(e.to_string()),
        }
    }
}
