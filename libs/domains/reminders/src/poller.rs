//! Periodic reminder scan.
//!
//! Each tick runs two passes:
//! - notification: email every reminder due inside the lookahead window, then
//!   flag it as sent
//! - expiry: flag every reminder whose time has passed
//!
//! The expiry pass does not depend on the notification pass: it runs when the
//! notification query fails and when mail is disabled.
//!
//! A send that succeeds but whose flag write is lost is sent again on the next
//! tick. There is no dedup token, so delivery is at-least-once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use core_config::{ConfigError, FromEnv, env_parse};
use domain_notifications::{
    DispatchReport, EmailProvider, NotificationError, ReminderEmailData, TemplateEngine, attempt,
};
use metrics::counter;
use stream_worker::{TaskHandle, sleep_or_shutdown};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::ReminderResult;
use crate::models::DueReminder;
use crate::store::ReminderStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Pause between ticks.
    pub poll_interval: Duration,
    /// How far ahead of `now` a reminder becomes due for its email.
    pub lookahead: chrono::Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            lookahead: chrono::Duration::minutes(15),
        }
    }
}

/// - `REMINDER_POLL_INTERVAL_SECS` (default 300)
/// - `REMINDER_LOOKAHEAD_MINUTES` (default 15)
impl FromEnv for PollerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let interval_secs: u64 = env_parse("REMINDER_POLL_INTERVAL_SECS", 300)?;
        if interval_secs == 0 {
            return Err(ConfigError::ParseError {
                key: "REMINDER_POLL_INTERVAL_SECS".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        let lookahead_minutes: i64 = env_parse("REMINDER_LOOKAHEAD_MINUTES", 15)?;
        if lookahead_minutes <= 0 {
            return Err(ConfigError::ParseError {
                key: "REMINDER_LOOKAHEAD_MINUTES".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            poll_interval: Duration::from_secs(interval_secs),
            lookahead: chrono::Duration::minutes(lookahead_minutes),
        })
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// One entry per reminder the notification pass tried to email.
    pub notified: DispatchReport,
    /// Sent reminders whose flag was written.
    pub marked_notified: usize,
    /// Reminders newly flagged as expired.
    pub expired: u64,
    /// Shutdown was requested during the notification pass.
    pub interrupted: bool,
    /// The notification pass could not load its reminders. The expiry pass
    /// still ran.
    pub notification_error: Option<String>,
}

/// Where reminder emails go.
struct Mailer {
    provider: Arc<dyn EmailProvider>,
    templates: Arc<TemplateEngine>,
}

pub struct ReminderPoller {
    store: Arc<dyn ReminderStore>,
    mailer: Option<Mailer>,
    config: PollerConfig,
}

impl ReminderPoller {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        provider: Arc<dyn EmailProvider>,
        templates: Arc<TemplateEngine>,
        config: PollerConfig,
    ) -> Self {
        Self {
            store,
            mailer: Some(Mailer {
                provider,
                templates,
            }),
            config,
        }
    }

    /// A poller with mail disabled: it never sends, but still expires
    /// reminders whose time has passed.
    pub fn expiry_only(store: Arc<dyn ReminderStore>, config: PollerConfig) -> Self {
        Self {
            store,
            mailer: None,
            config,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn mail_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Run both passes once.
    ///
    /// The passes are independent: a failed notification query is recorded in
    /// the report and the expiry pass runs anyway. Only an expiry failure is
    /// returned as an error.
    pub async fn tick(&self, now: DateTime<Utc>) -> ReminderResult<TickReport> {
        let (_keep_open, shutdown) = watch::channel(false);
        self.tick_until(now, &shutdown).await
    }

    async fn tick_until(
        &self,
        now: DateTime<Utc>,
        shutdown: &watch::Receiver<bool>,
    ) -> ReminderResult<TickReport> {
        let mut report = TickReport::default();

        if let Some(mailer) = &self.mailer
            && let Err(e) = self.notify(mailer, now, shutdown, &mut report).await
        {
            counter!("reminder_notification_pass_errors_total").increment(1);
            error!(error = %e, "Notification pass failed, continuing with expiry");
            report.notification_error = Some(e.to_string());
        }

        if !report.interrupted {
            report.expired = self.expire(now).await?;
        }

        counter!("reminder_ticks_total").increment(1);
        info!(
            attempted = report.notified.attempted,
            sent = report.notified.succeeded,
            failed = report.notified.failed(),
            expired = report.expired,
            "Reminder tick complete"
        );
        Ok(report)
    }

    async fn notify(
        &self,
        mailer: &Mailer,
        now: DateTime<Utc>,
        shutdown: &watch::Receiver<bool>,
        report: &mut TickReport,
    ) -> ReminderResult<()> {
        let due = self
            .store
            .find_due_for_notification(now, self.config.lookahead)
            .await?;
        debug!(count = due.len(), "Reminders due for notification");

        for item in due {
            if *shutdown.borrow() {
                info!("Shutdown requested, leaving remaining reminders for the next run");
                report.interrupted = true;
                break;
            }

            let id = item.reminder.id;
            let label = id.to_string();
            if attempt(&mut report.notified, &label, Self::send(mailer, &item, now))
                .await
                .is_none()
            {
                counter!("reminder_emails_failed_total").increment(1);
                continue;
            }
            counter!("reminder_emails_sent_total").increment(1);

            match self.store.mark_notified(id, now).await {
                Ok(true) => report.marked_notified += 1,
                Ok(false) => debug!(reminder_id = %id, "Reminder was already flagged as sent"),
                Err(e) => warn!(
                    reminder_id = %id,
                    error = %e,
                    "Email sent but flag not saved, reminder will be sent again next tick"
                ),
            }
        }
        Ok(())
    }

    async fn send(
        mailer: &Mailer,
        item: &DueReminder,
        now: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        let reminder = &item.reminder;
        let data = ReminderEmailData::new(
            reminder.title.clone(),
            reminder.note.clone(),
            reminder.reminder_time,
            now,
        );
        let email = mailer
            .templates
            .render_reminder(&data)?
            .to(item.owner_email.clone(), "");

        mailer.provider.send(&email).await?;
        info!(
            reminder_id = %reminder.id,
            to = %item.owner_email,
            minutes_remaining = data.minutes_remaining,
            "Reminder email sent"
        );
        Ok(())
    }

    async fn expire(&self, now: DateTime<Utc>) -> ReminderResult<u64> {
        let ids: Vec<_> = self
            .store
            .find_due_for_expiry(now)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let expired = self.store.mark_expired(ids, now).await?;
        counter!("reminders_expired_total").increment(expired);
        if expired > 0 {
            info!(count = expired, "Marked reminders as expired");
        }
        Ok(expired)
    }

    /// Tick now, then every `poll_interval` until shutdown.
    ///
    /// A failed tick is logged and the loop carries on.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> ReminderResult<()> {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            lookahead_minutes = self.config.lookahead.num_minutes(),
            mail_enabled = self.mail_enabled(),
            "Starting reminder poller"
        );

        loop {
            if let Err(e) = self.tick_until(Utc::now(), &shutdown).await {
                counter!("reminder_tick_errors_total").increment(1);
                error!(error = %e, "Reminder tick failed");
            }

            if sleep_or_shutdown(&mut shutdown, self.config.poll_interval).await {
                break;
            }
        }

        info!("Reminder poller stopped");
        Ok(())
    }

    /// Start `run` as a background task.
    pub fn spawn(self) -> TaskHandle {
        TaskHandle::spawn("reminder-poller", move |shutdown| self.run(shutdown))
    }
}
