//! Notifications Domain
//!
//! The mail side of Boversal's two notification paths.
//!
//! ```text
//! reminders store ──► ReminderPoller ──┐
//!                                      ├──► EmailProvider (SMTP)
//! meeting-created ──► InvitationProcessor ┘
//! ```
//!
//! - [`providers`]: the Notification Sink (`EmailProvider`, `SmtpProvider`)
//! - [`templates`]: handlebars rendering for reminder and invitation emails
//! - [`events`]: the `MeetingCreatedEvent` wire contract
//! - [`dispatch`]: per-item failure isolation shared by both paths
//! - [`processor`]: invitation fan-out for the stream worker
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{InvitationProcessor, MeetingCreatedStream, SmtpProvider, TemplateEngine};
//! use stream_worker::{StreamWorker, WorkerConfig};
//!
//! let provider = Arc::new(SmtpProvider::new(smtp_config)?);
//! let processor = InvitationProcessor::new(provider, Arc::new(TemplateEngine::new()?));
//! let config = WorkerConfig::from_stream_def::<MeetingCreatedStream>();
//! let handle = StreamWorker::from_redis(redis, Arc::new(processor), config).spawn();
//! ```

pub mod dispatch;
pub mod error;
pub mod events;
pub mod processor;
pub mod providers;
pub mod streams;
pub mod templates;

pub use dispatch::{DispatchFailure, DispatchReport, attempt, attempt_all};
pub use error::{NotificationError, NotificationResult};
pub use events::MeetingCreatedEvent;
pub use processor::InvitationProcessor;
pub use providers::{
    EmailContent, EmailProvider, RecordingProvider, SentEmail, SmtpConfig, SmtpProvider,
};
pub use streams::MeetingCreatedStream;
pub use templates::{InvitationEmailData, ReminderEmailData, RenderedEmail, TemplateEngine};
