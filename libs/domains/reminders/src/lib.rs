//! Reminders Domain
//!
//! Personal reminders and the background poller that emails them shortly
//! before they are due and expires them once they have passed.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ ReminderPoller │  ← tick: notification pass, expiry pass
//! └───────┬────────┘
//!         │
//! ┌───────▼────────┐
//! │ ReminderStore  │  ← Postgres (sea-orm) or in-memory
//! └───────┬────────┘
//!         │
//! ┌───────▼────────┐
//! │     Models     │  ← Reminder, flag transitions, edit rules
//! └────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_notifications::{RecordingProvider, TemplateEngine};
//! use domain_reminders::{PgReminderStore, PollerConfig, ReminderPoller};
//! use sea_orm::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("postgres://...").await?;
//!
//! let poller = ReminderPoller::new(
//!     Arc::new(PgReminderStore::new(db)),
//!     Arc::new(RecordingProvider::new()),
//!     Arc::new(TemplateEngine::new()?),
//!     PollerConfig::default(),
//! );
//! let handle = poller.spawn();
//! // ...
//! handle.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod memory;
pub mod models;
pub mod poller;
pub mod postgres;
pub mod store;

pub use error::{ReminderError, ReminderResult};
pub use memory::InMemoryReminderStore;
pub use models::{CreateReminder, DueReminder, Reminder, UpdateReminder};
pub use poller::{PollerConfig, ReminderPoller, TickReport};
pub use postgres::PgReminderStore;
pub use store::ReminderStore;
