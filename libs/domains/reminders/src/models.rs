use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ReminderError, ReminderResult};

/// A scheduled personal notification.
///
/// `is_email_sent` only goes back to false when `reminder_time` is changed;
/// `is_expired` never goes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub note: Option<String>,
    pub reminder_time: DateTime<Utc>,
    pub is_email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a reminder
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReminder {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub note: Option<String>,

    pub reminder_time: DateTime<Utc>,
}

/// Partial edit. An empty title is ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReminder {
    #[validate(length(max = 255))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub note: Option<String>,

    pub reminder_time: Option<DateTime<Utc>>,

    pub is_completed: Option<bool>,
}

/// A reminder ready for the notification pass, with its owner's address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    pub reminder: Reminder,
    pub owner_email: String,
}

impl Reminder {
    pub fn new(user_id: Uuid, input: CreateReminder, now: DateTime<Utc>) -> ReminderResult<Self> {
        input.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            title: input.title,
            note: input.note,
            reminder_time: input.reminder_time,
            is_email_sent: false,
            email_sent_at: None,
            is_expired: false,
            is_completed: false,
            created_at: now,
            updated_at: None,
        })
    }

    /// Eligible for the notification pass: unsent, live, and due in `(now, now + window]`.
    pub fn is_due_for_notification(&self, now: DateTime<Utc>, window: Duration) -> bool {
        !self.is_email_sent
            && !self.is_expired
            && !self.is_completed
            && self.reminder_time > now
            && self.reminder_time <= now + window
    }

    /// Eligible for the expiry pass: time has passed and not yet flagged.
    pub fn is_due_for_expiry(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired && self.reminder_time < now
    }

    /// Apply a user edit.
    ///
    /// Fails on expired reminders and on times in the past. Moving
    /// `reminder_time` re-arms the email.
    pub fn apply_update(&mut self, update: UpdateReminder, now: DateTime<Utc>) -> ReminderResult<()> {
        update.validate()?;

        if self.is_expired {
            return Err(ReminderError::Expired(self.id));
        }
        if let Some(time) = update.reminder_time
            && time < now
        {
            return Err(ReminderError::Validation(
                "reminder time cannot be in the past".to_string(),
            ));
        }

        if let Some(title) = update.title.filter(|t| !t.is_empty()) {
            self.title = title;
        }
        if let Some(note) = update.note {
            self.note = Some(note);
        }
        if let Some(time) = update.reminder_time
            && time != self.reminder_time
        {
            self.reminder_time = time;
            self.is_email_sent = false;
            self.email_sent_at = None;
        }
        if let Some(completed) = update.is_completed {
            self.is_completed = completed;
        }
        self.updated_at = Some(now);
        Ok(())
    }

    pub(crate) fn mark_notified(&mut self, sent_at: DateTime<Utc>) -> bool {
        if self.is_email_sent {
            return false;
        }
        self.is_email_sent = true;
        self.email_sent_at = Some(sent_at);
        self.updated_at = Some(sent_at);
        true
    }

    pub(crate) fn mark_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_expired {
            return false;
        }
        self.is_expired = true;
        self.updated_at = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder_at(now: DateTime<Utc>, offset: Duration) -> Reminder {
        Reminder::new(
            Uuid::new_v4(),
            CreateReminder {
                title: "Dentist".to_string(),
                note: None,
                reminder_time: now + offset,
            },
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_new_reminder_starts_unflagged() {
        let now = Utc::now();
        let r = reminder_at(now, Duration::hours(1));
        assert!(!r.is_email_sent);
        assert!(!r.is_expired);
        assert!(!r.is_completed);
        assert!(r.email_sent_at.is_none());
        assert!(r.updated_at.is_none());
    }

    #[test]
    fn test_empty_title_rejected() {
        let result = Reminder::new(
            Uuid::new_v4(),
            CreateReminder {
                title: String::new(),
                note: None,
                reminder_time: Utc::now(),
            },
            Utc::now(),
        );
        assert!(matches!(result, Err(ReminderError::Validation(_))));
    }

    #[test]
    fn test_notification_window_bounds() {
        let now = Utc::now();
        let window = Duration::minutes(15);

        assert!(reminder_at(now, Duration::minutes(10)).is_due_for_notification(now, window));
        assert!(reminder_at(now, Duration::minutes(15)).is_due_for_notification(now, window));
        assert!(!reminder_at(now, Duration::zero()).is_due_for_notification(now, window));
        assert!(!reminder_at(now, Duration::minutes(16)).is_due_for_notification(now, window));
    }

    #[test]
    fn test_flags_exclude_from_notification() {
        let now = Utc::now();
        let window = Duration::minutes(15);

        let mut sent = reminder_at(now, Duration::minutes(5));
        sent.is_email_sent = true;
        let mut done = reminder_at(now, Duration::minutes(5));
        done.is_completed = true;

        assert!(!sent.is_due_for_notification(now, window));
        assert!(!done.is_due_for_notification(now, window));
    }

    #[test]
    fn test_expiry_ignores_email_flag() {
        let now = Utc::now();
        let mut r = reminder_at(now, -Duration::minutes(1));
        r.is_email_sent = true;
        assert!(r.is_due_for_expiry(now));

        r.is_expired = true;
        assert!(!r.is_due_for_expiry(now));
    }

    #[test]
    fn test_reschedule_rearms_email() {
        let now = Utc::now();
        let mut r = reminder_at(now, Duration::minutes(5));
        r.mark_notified(now);

        r.apply_update(
            UpdateReminder {
                reminder_time: Some(now + Duration::hours(2)),
                ..Default::default()
            },
            now,
        )
        .unwrap();

        assert!(!r.is_email_sent);
        assert!(r.email_sent_at.is_none());
        assert_eq!(r.updated_at, Some(now));
    }

    #[test]
    fn test_same_time_keeps_email_flag() {
        let now = Utc::now();
        let mut r = reminder_at(now, Duration::minutes(5));
        r.mark_notified(now);
        let same = r.reminder_time;

        r.apply_update(
            UpdateReminder {
                reminder_time: Some(same),
                title: Some(String::new()),
                ..Default::default()
            },
            now,
        )
        .unwrap();

        assert!(r.is_email_sent);
        assert_eq!(r.title, "Dentist");
    }

    #[test]
    fn test_expired_reminder_is_read_only() {
        let now = Utc::now();
        let mut r = reminder_at(now, -Duration::minutes(5));
        r.mark_expired(now);

        let err = r
            .apply_update(
                UpdateReminder {
                    is_completed: Some(true),
                    ..Default::default()
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, ReminderError::Expired(_)));
        assert!(!r.is_completed);
    }

    #[test]
    fn test_past_time_rejected() {
        let now = Utc::now();
        let mut r = reminder_at(now, Duration::minutes(30));

        let err = r
            .apply_update(
                UpdateReminder {
                    reminder_time: Some(now - Duration::minutes(1)),
                    ..Default::default()
                },
                now,
            )
            .unwrap_err();
        assert!(matches!(err, ReminderError::Validation(_)));
    }

    #[test]
    fn test_flag_transitions_are_one_way() {
        let now = Utc::now();
        let mut r = reminder_at(now, Duration::minutes(5));

        assert!(r.mark_notified(now));
        assert!(!r.mark_notified(now + Duration::minutes(1)));
        assert_eq!(r.email_sent_at, Some(now));

        assert!(r.mark_expired(now));
        assert!(!r.mark_expired(now));
    }
}
