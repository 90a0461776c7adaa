//! Stream consumer for Redis operations
//!
//! Reads a topic through a consumer group. Entries stay in the group's pending
//! list until committed, so a crash before commit means redelivery.

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::event::StreamMessage;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamId, StreamReadReply};
use redis::{AsyncCommands, RedisResult};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Consume side of the broker.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Join `group` on `topic`, creating both if needed.
    async fn subscribe(&mut self, topic: &str, group: &str) -> Result<(), StreamError>;

    /// Wait at most `timeout` for the next message.
    async fn poll(&mut self, timeout: Duration) -> Result<Option<StreamMessage>, StreamError>;

    /// Mark `message` consumed so it is not redelivered.
    async fn commit(&mut self, message: &StreamMessage) -> Result<(), StreamError>;

    /// Leave the group cleanly.
    async fn close(&mut self) -> Result<(), StreamError>;
}

#[derive(Debug, Clone)]
struct Subscription {
    topic: String,
    group: String,
}

/// Redis Streams subscriber
pub struct StreamConsumer {
    redis: ConnectionManager,
    config: WorkerConfig,
    subscription: Option<Subscription>,
    last_claim: Option<Instant>,
}

impl StreamConsumer {
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self {
            redis,
            config,
            subscription: None,
            last_claim: None,
        }
    }

    pub fn consumer_name(&self) -> &str {
        &self.config.consumer_name
    }

    fn subscription(&self) -> Result<&Subscription, StreamError> {
        self.subscription
            .as_ref()
            .ok_or_else(|| StreamError::NotSubscribed(self.config.consumer_name.clone()))
    }

    /// Create the consumer group if it doesn't exist
    async fn ensure_group(&self, topic: &str, group: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(topic)
            .arg(group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!(stream = %topic, group = %group, "Created consumer group"),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(stream = %topic, group = %group, "Consumer group already exists")
            }
            Err(e) => return Err(StreamError::Redis(e)),
        }

        Ok(())
    }

    /// Take over entries another consumer left pending for longer than `claim_idle_ms`.
    ///
    /// They land in this consumer's pending list and are returned by `poll`.
    async fn claim_abandoned(&mut self) -> Result<usize, StreamError> {
        let sub = self.subscription()?.clone();
        let mut conn = self.redis.clone();

        let (_next, claimed, deleted): (String, Vec<String>, Vec<String>) =
            redis::cmd("XAUTOCLAIM")
                .arg(&sub.topic)
                .arg(&sub.group)
                .arg(&self.config.consumer_name)
                .arg(self.config.claim_idle_ms)
                .arg("0-0")
                .arg("COUNT")
                .arg(self.config.claim_batch)
                .arg("JUSTID")
                .query_async(&mut conn)
                .await?;

        self.last_claim = Some(Instant::now());

        if !deleted.is_empty() {
            warn!(
                stream = %sub.topic,
                count = deleted.len(),
                "Pending entries were trimmed before delivery"
            );
        }
        if !claimed.is_empty() {
            warn!(
                stream = %sub.topic,
                count = claimed.len(),
                "Claimed abandoned messages"
            );
        }

        Ok(claimed.len())
    }

    fn claim_due(&self) -> bool {
        match self.last_claim {
            Some(at) => at.elapsed() >= Duration::from_millis(self.config.claim_idle_ms),
            None => true,
        }
    }

    /// XREADGROUP for one entry. `id` is "0" for own pending entries, ">" for new ones.
    async fn read_one(
        &self,
        id: &str,
        block: Option<Duration>,
    ) -> Result<Option<StreamMessage>, StreamError> {
        let sub = self.subscription()?;
        let mut conn = self.redis.clone();

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&sub.group)
            .arg(&self.config.consumer_name)
            .arg("COUNT")
            .arg(1);
        if let Some(block) = block {
            cmd.arg("BLOCK").arg(block.as_millis().max(1) as u64);
        }
        cmd.arg("STREAMS").arg(&sub.topic).arg(id);

        let reply: Option<StreamReadReply> = cmd.query_async(&mut conn).await?;

        let entry = reply
            .into_iter()
            .flat_map(|r| r.keys)
            .flat_map(|k| k.ids)
            .next();

        Ok(entry.map(|e| to_message(e, id == "0")))
    }
}

/// Convert a raw entry. Trimmed pending entries come back with no fields.
fn to_message(entry: StreamId, redelivered: bool) -> StreamMessage {
    let fields: HashMap<String, String> = entry
        .map
        .keys()
        .filter_map(|k| entry.get::<String>(k).map(|v| (k.clone(), v)))
        .collect();
    StreamMessage::from_fields(entry.id.clone(), &fields).redelivered(redelivered)
}

#[async_trait]
impl EventSubscriber for StreamConsumer {
    async fn subscribe(&mut self, topic: &str, group: &str) -> Result<(), StreamError> {
        self.ensure_group(topic, group).await?;
        self.subscription = Some(Subscription {
            topic: topic.to_string(),
            group: group.to_string(),
        });

        if let Err(e) = self.claim_abandoned().await {
            warn!(error = %e, "Failed to claim abandoned messages on subscribe");
        }

        info!(
            stream = %topic,
            group = %group,
            consumer = %self.config.consumer_name,
            "Subscribed"
        );
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<StreamMessage>, StreamError> {
        if self.claim_due() {
            if let Err(e) = self.claim_abandoned().await {
                debug!(error = %e, "Error claiming abandoned messages");
            }
        }

        // uncommitted entries first, so a deferred message is retried before new ones
        if let Some(message) = self.read_one("0", None).await? {
            return Ok(Some(message));
        }

        self.read_one(">", Some(timeout)).await
    }

    async fn commit(&mut self, message: &StreamMessage) -> Result<(), StreamError> {
        let sub = self.subscription()?;
        let mut conn = self.redis.clone();

        let _: i64 = conn.xack(&sub.topic, &sub.group, &[&message.id]).await?;

        debug!(stream_id = %message.id, "Committed message");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        let Some(sub) = self.subscription.take() else {
            return Ok(());
        };
        let mut conn = self.redis.clone();

        let pending: Vec<(String, String, i64, i64)> = redis::cmd("XPENDING")
            .arg(&sub.topic)
            .arg(&sub.group)
            .arg("-")
            .arg("+")
            .arg(1)
            .arg(&self.config.consumer_name)
            .query_async(&mut conn)
            .await?;

        if pending.is_empty() {
            let _: i64 = redis::cmd("XGROUP")
                .arg("DELCONSUMER")
                .arg(&sub.topic)
                .arg(&sub.group)
                .arg(&self.config.consumer_name)
                .query_async(&mut conn)
                .await?;
            info!(stream = %sub.topic, consumer = %self.config.consumer_name, "Left consumer group");
        } else {
            // keep the consumer so its uncommitted entries survive for redelivery
            info!(
                stream = %sub.topic,
                consumer = %self.config.consumer_name,
                "Closed with pending entries"
            );
        }

        Ok(())
    }
}
