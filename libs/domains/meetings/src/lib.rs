//! Meetings Domain
//!
//! Scheduling meetings and announcing each new one on the meeting-created
//! stream, where the invitation worker picks it up.
//!
//! Storing the meeting never depends on the announcement: a broker outage
//! shows up as `PublishOutcome::Failed` next to the stored meeting.
//!
//! ```rust,no_run
//! use domain_meetings::{MeetingEventPublisher, MeetingService, PgMeetingRepository};
//! use sea_orm::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("postgres://...").await?;
//! let service = MeetingService::new(
//!     PgMeetingRepository::new(db),
//!     MeetingEventPublisher::disabled(),
//! );
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod publisher;
pub mod repository;
pub mod service;

pub use error::{MeetingError, MeetingResult};
pub use models::{CreateMeeting, Meeting, Organizer};
pub use postgres::PgMeetingRepository;
pub use publisher::{MeetingEventPublisher, PublishOutcome};
pub use repository::MeetingRepository;
pub use service::{CreatedMeeting, MeetingService};
