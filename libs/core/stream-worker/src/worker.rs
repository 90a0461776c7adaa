//! Core worker traits and the generic StreamWorker implementation.
//!
//! Each message moves `received -> parsed -> processed -> committed`:
//! - a message that does not parse is logged, counted as poison and committed
//! - a permanent processing error is logged and committed
//! - a transient or rate-limited error leaves the message uncommitted; the
//!   loop backs off and the subscriber hands it back on the next poll
//!
//! Broker failures (poll, subscribe) back off exponentially and never end the loop.

use crate::config::WorkerConfig;
use crate::consumer::{EventSubscriber, StreamConsumer};
use crate::error::{ErrorCategory, StreamError};
use crate::event::StreamMessage;
use crate::lifecycle::{TaskHandle, sleep_or_shutdown};
use crate::metrics::StreamMetrics;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Trait for message payloads a worker can decode.
pub trait StreamJob: DeserializeOwned + Send + Sync {
    /// Identifier used in logs.
    fn job_id(&self) -> String;
}

/// Trait for message processors.
///
/// # Example
///
/// ```rust,ignore
/// #[async_trait]
/// impl StreamProcessor<MeetingCreatedEvent> for InvitationProcessor {
///     async fn process(&self, event: &MeetingCreatedEvent) -> Result<(), StreamError> {
///         self.fan_out(event).await;
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "invitation"
///     }
/// }
/// ```
#[async_trait]
pub trait StreamProcessor<J: StreamJob>: Send + Sync {
    /// Process a single message.
    ///
    /// The error category decides whether the message is committed anyway
    /// (`Permanent`) or left for redelivery.
    async fn process(&self, job: &J) -> Result<(), StreamError>;

    /// Get the processor name for logging.
    fn name(&self) -> &'static str;

    /// Health check for the processor.
    async fn health_check(&self) -> Result<bool, StreamError> {
        Ok(true)
    }
}

/// What the loop decided for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processed successfully
    Processed,
    /// Could not be parsed; dropped
    Poison,
    /// Failed permanently; dropped
    Rejected,
    /// Failed with a retryable error; left uncommitted
    Deferred(ErrorCategory),
}

impl Disposition {
    pub fn commits(&self) -> bool {
        !matches!(self, Disposition::Deferred(_))
    }
}

/// Generic consume loop over one topic.
pub struct StreamWorker<J, P>
where
    J: StreamJob,
    P: StreamProcessor<J>,
{
    subscriber: Box<dyn EventSubscriber>,
    processor: Arc<P>,
    config: WorkerConfig,
    metrics: StreamMetrics,
    _phantom: PhantomData<fn() -> J>,
}

impl<J, P> StreamWorker<J, P>
where
    J: StreamJob + 'static,
    P: StreamProcessor<J> + 'static,
{
    /// Create a worker over any subscriber.
    pub fn new(
        subscriber: impl EventSubscriber + 'static,
        processor: Arc<P>,
        config: WorkerConfig,
    ) -> Self {
        let metrics = StreamMetrics::new(&config.stream_name, processor.name());
        Self {
            subscriber: Box::new(subscriber),
            processor,
            config,
            metrics,
            _phantom: PhantomData,
        }
    }

    /// Create a worker reading from Redis.
    pub fn from_redis(redis: ConnectionManager, processor: Arc<P>, config: WorkerConfig) -> Self {
        let consumer = StreamConsumer::new(redis, config.clone());
        Self::new(consumer, processor, config)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Start the loop on its own task.
    pub fn spawn(self) -> TaskHandle {
        let name = format!("{}-worker", self.processor.name());
        TaskHandle::spawn(name, move |shutdown| self.run(shutdown))
    }

    /// Decode and process one message. Never fails; the outcome says whether to commit.
    pub async fn handle(&self, message: &StreamMessage) -> Disposition {
        self.metrics.message_received(message.redelivered);

        let job: J = match message.decode() {
            Ok(job) => job,
            Err(e) => {
                warn!(
                    stream_id = %message.id,
                    key = ?message.key,
                    error = %e,
                    "Dropping message that could not be parsed"
                );
                self.metrics.message_poison();
                return Disposition::Poison;
            }
        };

        let start = Instant::now();
        match self.processor.process(&job).await {
            Ok(()) => {
                self.metrics.message_processed(start.elapsed());
                debug!(
                    stream_id = %message.id,
                    job_id = %job.job_id(),
                    "Processed message"
                );
                Disposition::Processed
            }
            Err(e) => {
                let category = e.category();
                self.metrics.processing_failed(category);
                if category.is_retryable() {
                    warn!(
                        stream_id = %message.id,
                        job_id = %job.job_id(),
                        error = %e,
                        error_category = ?category,
                        "Processing failed, message left for redelivery"
                    );
                    Disposition::Deferred(category)
                } else {
                    error!(
                        stream_id = %message.id,
                        job_id = %job.job_id(),
                        error = %e,
                        "Processing failed permanently, committing"
                    );
                    Disposition::Rejected
                }
            }
        }
    }

    /// Subscribe, retrying with backoff. Returns `false` if shutdown came first.
    async fn subscribe(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let mut consecutive_errors: u32 = 0;

        loop {
            if *shutdown.borrow() {
                return false;
            }

            match self
                .subscriber
                .subscribe(&self.config.stream_name, &self.config.consumer_group)
                .await
            {
                Ok(()) => return true,
                Err(e) => {
                    consecutive_errors += 1;
                    self.metrics.broker_error("subscribe");
                    let delay = self.config.error_backoff(consecutive_errors);
                    warn!(
                        error = %e,
                        consecutive_errors,
                        backoff_ms = delay.as_millis() as u64,
                        "Subscribe failed, backing off"
                    );
                    if sleep_or_shutdown(shutdown, delay).await {
                        return false;
                    }
                }
            }
        }
    }

    /// Run the loop until shutdown.
    ///
    /// A message being processed when shutdown arrives is finished and
    /// committed before the subscriber is closed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            consumer = %self.config.consumer_name,
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            processor = %self.processor.name(),
            poll_timeout_ms = self.config.poll_timeout_ms,
            "Starting stream worker"
        );

        if !self.subscribe(&mut shutdown).await {
            info!("Shutdown before subscription, stream worker not started");
            return Ok(());
        }

        let mut consecutive_errors: u32 = 0;
        let mut deferrals: u32 = 0;

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping worker");
                break;
            }

            let message = match self.subscriber.poll(self.config.poll_timeout()).await {
                Ok(polled) => {
                    if consecutive_errors > 0 {
                        info!(consecutive_errors, "Broker connection recovered");
                        consecutive_errors = 0;
                    }
                    match polled {
                        Some(message) => message,
                        None => continue,
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    self.metrics.broker_error("poll");

                    if e.is_nogroup() {
                        warn!("Consumer group missing, recreating");
                        if let Err(err) = self
                            .subscriber
                            .subscribe(&self.config.stream_name, &self.config.consumer_group)
                            .await
                        {
                            error!(error = %err, "Failed to recreate consumer group");
                        }
                    }

                    let delay = self.config.error_backoff(consecutive_errors);
                    warn!(
                        error = %e,
                        consecutive_errors,
                        backoff_ms = delay.as_millis() as u64,
                        "Poll failed, backing off"
                    );
                    if sleep_or_shutdown(&mut shutdown, delay).await {
                        break;
                    }
                    continue;
                }
            };

            match self.handle(&message).await {
                Disposition::Deferred(category) => {
                    let delay = Duration::from_millis(category.backoff_delay_ms(deferrals));
                    deferrals = deferrals.saturating_add(1);
                    if sleep_or_shutdown(&mut shutdown, delay).await {
                        break;
                    }
                }
                _ => {
                    deferrals = 0;
                    match self.subscriber.commit(&message).await {
                        Ok(()) => self.metrics.message_committed(),
                        Err(e) => {
                            self.metrics.broker_error("commit");
                            error!(
                                stream_id = %message.id,
                                error = %e,
                                "Commit failed, message will be redelivered"
                            );
                        }
                    }
                }
            }
        }

        if let Err(e) = self.subscriber.close().await {
            warn!(error = %e, "Failed to close subscriber");
        }

        info!("Stream worker stopped");
        Ok(())
    }
}
