//! Durable, idempotent publishing onto a stream
//!
//! Every publish carries a caller-supplied key. A Lua script appends the entry
//! and records the key atomically, so a retry after a lost reply returns the
//! original entry instead of appending a duplicate. With `Acks::All` the
//! producer then waits for replicas via `WAIT`.
//!
//! # Example
//!
//! ```rust,ignore
//! use stream_worker::{publish_event, ProducerConfig, StreamProducer};
//!
//! let producer = StreamProducer::new(redis, ProducerConfig::default());
//! let ack = publish_event(&producer, "meeting-created", &event).await?;
//! ```

use crate::config::{Acks, ProducerConfig};
use crate::error::StreamError;
use crate::metrics::StreamMetrics;
use crate::registry::dedup_key;
use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::Script;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// KEYS[1] stream, KEYS[2] dedup marker.
/// ARGV: max_length, key, payload, published_at, ttl_secs.
const PUBLISH_SCRIPT: &str = r#"
local existing = redis.call('GET', KEYS[2])
if existing then
  return {existing, 1}
end
local id = redis.call('XADD', KEYS[1], 'MAXLEN', '~', ARGV[1], '*',
  'key', ARGV[2], 'payload', ARGV[3], 'published_at', ARGV[4])
redis.call('SET', KEYS[2], id, 'EX', ARGV[5])
return {id, 0}
"#;

/// Broker acknowledgment of a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    /// Stream entry id holding the record
    pub message_id: String,
    /// The key had already been published; no new entry was written
    pub deduplicated: bool,
    /// Replicas that confirmed the write, when `WAIT` ran
    pub replicas: Option<usize>,
}

/// Publish side of the broker.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Append `payload` to `topic` under `key`.
    ///
    /// Publishing the same `(topic, key)` twice yields one record.
    async fn publish(&self, topic: &str, key: &str, payload: &str)
    -> Result<PublishAck, StreamError>;
}

/// Serialize `event` and publish it under a fresh random key.
pub async fn publish_event<T>(
    publisher: &dyn EventPublisher,
    topic: &str,
    event: &T,
) -> Result<PublishAck, StreamError>
where
    T: Serialize + Sync,
{
    let payload = serde_json::to_string(event)?;
    let key = Uuid::new_v4().to_string();
    publisher.publish(topic, &key, &payload).await
}

/// Redis Streams publisher.
#[derive(Clone)]
pub struct StreamProducer {
    redis: ConnectionManager,
    config: ProducerConfig,
    script: Arc<Script>,
}

impl StreamProducer {
    pub fn new(redis: ConnectionManager, config: ProducerConfig) -> Self {
        Self {
            redis,
            config,
            script: Arc::new(Script::new(PUBLISH_SCRIPT)),
        }
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// One attempt: append (or find) the entry, then wait for replicas.
    async fn try_publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
        published_at: &str,
    ) -> Result<PublishAck, StreamError> {
        let mut conn = self.redis.clone();

        let (message_id, existed): (String, i64) = self
            .script
            .key(topic)
            .key(dedup_key(topic, key))
            .arg(self.config.max_length)
            .arg(key)
            .arg(payload)
            .arg(published_at)
            .arg(self.config.dedup_ttl_secs)
            .invoke_async(&mut conn)
            .await?;

        let replicas = match self.config.acks {
            Acks::All { min_replicas } if min_replicas > 0 => {
                let acked: i64 = redis::cmd("WAIT")
                    .arg(min_replicas)
                    .arg(self.config.ack_timeout_ms)
                    .query_async(&mut conn)
                    .await?;
                let acked = usize::try_from(acked).unwrap_or(0);
                if acked < min_replicas {
                    return Err(StreamError::InsufficientAcks {
                        required: min_replicas,
                        acked,
                    });
                }
                Some(acked)
            }
            _ => None,
        };

        Ok(PublishAck {
            message_id,
            deduplicated: existed == 1,
            replicas,
        })
    }
}

#[async_trait]
impl EventPublisher for StreamProducer {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<PublishAck, StreamError> {
        let metrics = StreamMetrics::new(topic, "producer");
        let published_at = Utc::now().to_rfc3339();
        let mut attempt: u32 = 0;

        loop {
            match self.try_publish(topic, key, payload, &published_at).await {
                Ok(ack) => {
                    if ack.deduplicated {
                        metrics.publish_deduplicated();
                    }
                    metrics.published();
                    debug!(
                        stream = %topic,
                        key = %key,
                        message_id = %ack.message_id,
                        deduplicated = ack.deduplicated,
                        attempt,
                        "Published event"
                    );
                    return Ok(ack);
                }
                Err(e) if e.should_retry(attempt, self.config.max_retries) => {
                    let delay_ms = e.backoff_delay_ms(attempt);
                    warn!(
                        stream = %topic,
                        key = %key,
                        error = %e,
                        attempt,
                        delay_ms,
                        "Publish failed, retrying with same key"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                Err(e) => {
                    metrics.publish_failed(e.category());
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(
            &self,
            topic: &str,
            key: &str,
            payload: &str,
        ) -> Result<PublishAck, StreamError> {
            self.calls
                .lock()
                .unwrap()
                .push((topic.to_string(), key.to_string(), payload.to_string()));
            Ok(PublishAck {
                message_id: "1-0".to_string(),
                deduplicated: false,
                replicas: None,
            })
        }
    }

    #[derive(Serialize)]
    struct Hello {
        name: &'static str,
    }

    #[tokio::test]
    async fn test_publish_event_uses_fresh_key_per_call() {
        let publisher = RecordingPublisher::default();

        publish_event(&publisher, "greetings", &Hello { name: "a" })
            .await
            .unwrap();
        publish_event(&publisher, "greetings", &Hello { name: "a" })
            .await
            .unwrap();

        let calls = publisher.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "greetings");
        assert_eq!(calls[0].2, r#"{"name":"a"}"#);
        assert_ne!(calls[0].1, calls[1].1);
        assert!(Uuid::parse_str(&calls[0].1).is_ok());
    }
}
