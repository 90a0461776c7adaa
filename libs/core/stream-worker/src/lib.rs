//! Stream Worker Framework
//!
//! Publish/consume plumbing on Redis Streams for event-driven workers.
//!
//! ## Features
//!
//! - **Idempotent publisher**: `StreamProducer` dedups by key and can wait for replicas
//! - **Consumer groups**: `StreamConsumer` with redelivery of uncommitted entries
//! - **Consume loop**: `StreamWorker<J, P>` with poison handling and backoff
//! - **Lifecycle**: `TaskHandle` for explicit start/stop of background tasks
//! - **Prometheus metrics** and **health endpoints**
//!
//! ## Example
//!
//! ```ignore
//! use stream_worker::{StreamDef, StreamWorker, WorkerConfig};
//!
//! struct MeetingCreatedStream;
//! impl StreamDef for MeetingCreatedStream {
//!     const STREAM_NAME: &'static str = "meeting-created";
//!     const CONSUMER_GROUP: &'static str = "utility-service-group";
//! }
//!
//! let config = WorkerConfig::from_stream_def::<MeetingCreatedStream>();
//! let handle = StreamWorker::from_redis(redis, Arc::new(processor), config).spawn();
//! // ...
//! handle.stop().await?;
//! ```

mod config;
mod consumer;
mod error;
mod event;
mod health;
mod lifecycle;
pub mod metrics;
mod producer;
mod registry;
mod worker;

pub use config::{Acks, ProducerConfig, WorkerConfig};
pub use consumer::{EventSubscriber, StreamConsumer};
pub use error::{ErrorCategory, StreamError};
pub use event::StreamMessage;
pub use health::{HealthState, ReadinessCheck, RedisCheck, health_router, serve_health};
pub use lifecycle::{TaskHandle, shutdown_signal, sleep_or_shutdown};
pub use metrics::{StreamMetrics, init_metrics};
pub use producer::{EventPublisher, PublishAck, StreamProducer, publish_event};
pub use registry::{MessageKey, StreamDef, dedup_key};
pub use worker::{Disposition, StreamJob, StreamProcessor, StreamWorker};
