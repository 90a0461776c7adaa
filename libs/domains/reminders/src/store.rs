use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::ReminderResult;
use crate::models::{DueReminder, Reminder};

/// Persistence the poller needs.
///
/// Both mark operations are conditional on the flag still being false, so
/// repeating them is harmless.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Unsent, unexpired, uncompleted reminders with `now < reminder_time <= now + window`,
    /// joined with the owner's email.
    async fn find_due_for_notification(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> ReminderResult<Vec<DueReminder>>;

    /// Unexpired reminders whose time is before `now`.
    async fn find_due_for_expiry(&self, now: DateTime<Utc>) -> ReminderResult<Vec<Reminder>>;

    /// Set `is_email_sent`/`email_sent_at`. Returns false if it was already set
    /// or the reminder is gone.
    async fn mark_notified(&self, id: Uuid, sent_at: DateTime<Utc>) -> ReminderResult<bool>;

    /// Set `is_expired` on each id still unexpired. Returns how many changed.
    async fn mark_expired(&self, ids: Vec<Uuid>, now: DateTime<Utc>) -> ReminderResult<u64>;
}
