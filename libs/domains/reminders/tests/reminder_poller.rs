//! Poller scenarios against the in-memory store and a recording mail sink.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use domain_notifications::{RecordingProvider, TemplateEngine};
use domain_reminders::{
    CreateReminder, InMemoryReminderStore, PollerConfig, Reminder, ReminderPoller, UpdateReminder,
};
use uuid::Uuid;

struct Fixture {
    store: Arc<InMemoryReminderStore>,
    provider: Arc<RecordingProvider>,
    poller: ReminderPoller,
    user_id: Uuid,
}

async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryReminderStore::new());
    let provider = Arc::new(RecordingProvider::new());
    let user_id = Uuid::new_v4();
    store.add_user(user_id, "owner@x.com").await;

    let poller = ReminderPoller::new(
        store.clone(),
        provider.clone(),
        Arc::new(TemplateEngine::new().unwrap()),
        PollerConfig::default(),
    );

    Fixture {
        store,
        provider,
        poller,
        user_id,
    }
}

async fn add(fx: &Fixture, title: &str, at: DateTime<Utc>, now: DateTime<Utc>) -> Uuid {
    add_for(fx, fx.user_id, title, at, now).await
}

async fn add_for(
    fx: &Fixture,
    user_id: Uuid,
    title: &str,
    at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Uuid {
    let reminder = Reminder::new(
        user_id,
        CreateReminder {
            title: title.to_string(),
            note: Some("bring the paperwork".to_string()),
            reminder_time: at,
        },
        now,
    )
    .unwrap();
    let id = reminder.id;
    fx.store.insert(reminder).await;
    id
}

#[tokio::test]
async fn test_due_reminder_is_sent_once() {
    let fx = fixture().await;
    let now = Utc::now();
    let id = add(&fx, "Renew passport", now + Duration::minutes(10), now).await;

    let report = fx.poller.tick(now).await.unwrap();
    assert_eq!(report.notified.succeeded, 1);
    assert_eq!(report.marked_notified, 1);

    let sent = fx.provider.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "owner@x.com");
    assert_eq!(sent[0].subject, "Reminder: Renew passport");
    assert!(sent[0].text_body.contains("10 minutes remaining"));

    let stored = fx.store.get(id).await.unwrap();
    assert!(stored.is_email_sent);
    assert_eq!(stored.email_sent_at, Some(now));

    // still inside the window a minute later, but already sent
    let again = fx.poller.tick(now + Duration::minutes(1)).await.unwrap();
    assert_eq!(again.notified.attempted, 0);
    assert_eq!(fx.provider.sent().len(), 1);
}

#[tokio::test]
async fn test_outside_window_is_not_sent() {
    let fx = fixture().await;
    let now = Utc::now();
    add(&fx, "Later", now + Duration::minutes(40), now).await;

    let report = fx.poller.tick(now).await.unwrap();
    assert_eq!(report.notified.attempted, 0);
    assert!(fx.provider.sent().is_empty());
}

#[tokio::test]
async fn test_passed_reminders_expire_regardless_of_sent_flag() {
    let fx = fixture().await;
    let now = Utc::now();
    let sent = add(&fx, "Sent", now + Duration::minutes(5), now).await;
    let unsent = add(&fx, "Missed", now - Duration::minutes(30), now - Duration::hours(1)).await;

    let first = fx.poller.tick(now).await.unwrap();
    assert_eq!(first.expired, 1);
    assert!(fx.store.get(sent).await.unwrap().is_email_sent);

    let later = now + Duration::minutes(10);
    let report = fx.poller.tick(later).await.unwrap();
    assert_eq!(report.expired, 1);
    assert!(fx.store.get(sent).await.unwrap().is_expired);
    assert!(fx.store.get(unsent).await.unwrap().is_expired);

    // a missed reminder is never emailed
    assert_eq!(fx.provider.recipients(), vec!["owner@x.com"]);
}

#[tokio::test]
async fn test_expiry_is_idempotent() {
    let fx = fixture().await;
    let now = Utc::now();
    let id = add(&fx, "Old", now - Duration::minutes(1), now - Duration::hours(1)).await;

    assert_eq!(fx.poller.tick(now).await.unwrap().expired, 1);
    let first = fx.store.get(id).await.unwrap();

    assert_eq!(fx.poller.tick(now).await.unwrap().expired, 0);
    let second = fx.store.get(id).await.unwrap();
    assert!(second.is_expired);
    assert_eq!(first.updated_at, second.updated_at);
}

#[tokio::test]
async fn test_failure_is_isolated_and_retried_next_tick() {
    let fx = fixture().await;
    let now = Utc::now();

    let flaky_user = Uuid::new_v4();
    fx.store.add_user(flaky_user, "flaky@x.com").await;
    fx.provider.set_failing("flaky@x.com", true);

    let flaky = add_for(&fx, flaky_user, "Flaky", now + Duration::minutes(3), now).await;
    let fine = add(&fx, "Fine", now + Duration::minutes(4), now).await;

    let report = fx.poller.tick(now).await.unwrap();
    assert_eq!(report.notified.attempted, 2);
    assert_eq!(report.notified.failed(), 1);
    assert!(!fx.store.get(flaky).await.unwrap().is_email_sent);
    assert!(fx.store.get(fine).await.unwrap().is_email_sent);

    fx.provider.set_failing("flaky@x.com", false);
    let retry = fx.poller.tick(now + Duration::minutes(1)).await.unwrap();
    assert_eq!(retry.notified.succeeded, 1);
    assert!(fx.store.get(flaky).await.unwrap().is_email_sent);
}

#[tokio::test]
async fn test_completed_reminder_is_skipped() {
    let fx = fixture().await;
    let now = Utc::now();
    let id = add(&fx, "Done already", now + Duration::minutes(5), now).await;

    fx.store
        .update(
            id,
            UpdateReminder {
                is_completed: Some(true),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();

    fx.poller.tick(now).await.unwrap();
    assert!(fx.provider.sent().is_empty());
}

#[tokio::test]
async fn test_reschedule_sends_again() {
    let fx = fixture().await;
    let now = Utc::now();
    let id = add(&fx, "Call mum", now + Duration::minutes(5), now).await;

    fx.poller.tick(now).await.unwrap();
    fx.store
        .update(
            id,
            UpdateReminder {
                reminder_time: Some(now + Duration::minutes(12)),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();

    fx.poller.tick(now + Duration::minutes(1)).await.unwrap();
    assert_eq!(fx.provider.sent().len(), 2);
}

#[tokio::test]
async fn test_expiry_runs_without_mail() {
    let fx = fixture().await;
    let now = Utc::now();
    let missed = add(&fx, "Call the bank", now - Duration::minutes(5), now).await;
    let upcoming = add(&fx, "Pick up keys", now + Duration::minutes(5), now).await;

    let poller = ReminderPoller::expiry_only(fx.store.clone(), PollerConfig::default());
    let report = poller.tick(now).await.unwrap();

    assert_eq!(report.expired, 1);
    assert_eq!(report.notified.attempted, 0);
    assert!(fx.store.get(missed).await.unwrap().is_expired);

    let pending = fx.store.get(upcoming).await.unwrap();
    assert!(!pending.is_email_sent);
    assert!(!pending.is_expired);
}
