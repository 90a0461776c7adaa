//! `PgReminderStore` against a real Postgres. Needs Docker.

use chrono::{Duration, SubsecRound, Utc};
use domain_reminders::{
    CreateReminder, PgReminderStore, ReminderError, ReminderStore, UpdateReminder,
};
use test_utils::{TestDataBuilder, TestDatabase};

fn input(title: &str, at: chrono::DateTime<Utc>) -> CreateReminder {
    CreateReminder {
        title: title.to_string(),
        note: None,
        reminder_time: at,
    }
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_selection_matches_flags_and_window() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("test_selection_matches_flags_and_window");
    let email = builder.email("owner");
    let user_id = db.create_test_user(builder.user_id(), &email).await;
    let store = PgReminderStore::new(db.connection());

    // postgres keeps microseconds
    let now = Utc::now().trunc_subsecs(6);
    let due = store
        .create(user_id, input("due", now + Duration::minutes(10)), now)
        .await
        .unwrap();
    store
        .create(user_id, input("too far", now + Duration::minutes(20)), now)
        .await
        .unwrap();
    let passed = store
        .create(user_id, input("passed", now - Duration::minutes(1)), now)
        .await
        .unwrap();

    let found = store
        .find_due_for_notification(now, Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].reminder.id, due.id);
    assert_eq!(found[0].owner_email, email);

    let expiring = store.find_due_for_expiry(now).await.unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].id, passed.id);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_flag_updates_are_conditional() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("test_flag_updates_are_conditional");
    let user_id = db
        .create_test_user(builder.user_id(), &builder.email("owner"))
        .await;
    let store = PgReminderStore::new(db.connection());

    let now = Utc::now().trunc_subsecs(6);
    let soon = store
        .create(user_id, input("soon", now + Duration::minutes(5)), now)
        .await
        .unwrap();
    let old = store
        .create(user_id, input("old", now - Duration::minutes(5)), now)
        .await
        .unwrap();

    assert!(store.mark_notified(soon.id, now).await.unwrap());
    assert!(!store.mark_notified(soon.id, now).await.unwrap());
    let stored = store.get(soon.id).await.unwrap().unwrap();
    assert!(stored.is_email_sent);
    assert_eq!(stored.email_sent_at, Some(now));

    assert_eq!(store.mark_expired(vec![old.id], now).await.unwrap(), 1);
    assert_eq!(store.mark_expired(vec![old.id], now).await.unwrap(), 0);
    assert_eq!(store.mark_expired(vec![], now).await.unwrap(), 0);

    let err = store
        .update(
            old.id,
            UpdateReminder {
                title: Some("renamed".to_string()),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReminderError::Expired(_)));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_reschedule_and_delete() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("test_reschedule_and_delete");
    let user_id = db
        .create_test_user(builder.user_id(), &builder.email("owner"))
        .await;
    let store = PgReminderStore::new(db.connection());

    let now = Utc::now().trunc_subsecs(6);
    let reminder = store
        .create(user_id, input("move me", now + Duration::minutes(5)), now)
        .await
        .unwrap();
    store.mark_notified(reminder.id, now).await.unwrap();

    let moved = store
        .update(
            reminder.id,
            UpdateReminder {
                reminder_time: Some(now + Duration::hours(1)),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
    assert!(!moved.is_email_sent);
    assert!(moved.email_sent_at.is_none());

    assert!(store.delete(reminder.id).await.unwrap());
    assert!(store.get(reminder.id).await.unwrap().is_none());
    assert!(!store.delete(reminder.id).await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_reminders_go_with_their_owner() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("test_reminders_go_with_their_owner");
    let user_id = db
        .create_test_user(builder.user_id(), &builder.email("owner"))
        .await;
    let store = PgReminderStore::new(db.connection());

    let now = Utc::now().trunc_subsecs(6);
    store
        .create(user_id, input(&builder.title("Dentist"), now + Duration::hours(1)), now)
        .await
        .unwrap();
    assert_eq!(db.count_rows("reminders").await, 1);

    db.delete_user(user_id).await;
    assert_eq!(db.count_rows("reminders").await, 0);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_edit_after_poller_flags_keeps_them() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("test_edit_after_poller_flags_keeps_them");
    let user_id = db
        .create_test_user(builder.user_id(), &builder.email("owner"))
        .await;
    let store = PgReminderStore::new(db.connection());
    let now = Utc::now().trunc_subsecs(6);

    // sent between the user's read and write: a title edit keeps the flag
    let sent = store
        .create(user_id, input("sent", now + Duration::minutes(5)), now)
        .await
        .unwrap();
    let stale = store.get(sent.id).await.unwrap().unwrap();
    assert!(!stale.is_email_sent);
    assert!(store.mark_notified(sent.id, now).await.unwrap());

    let edited = store
        .update(
            sent.id,
            UpdateReminder {
                title: Some("sent, renamed".to_string()),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(edited.title, "sent, renamed");
    assert!(edited.is_email_sent);
    assert_eq!(edited.email_sent_at, Some(now));

    // expired between the user's read and write: the edit is refused
    let missed = store
        .create(user_id, input("missed", now - Duration::minutes(1)), now)
        .await
        .unwrap();
    let stale = store.get(missed.id).await.unwrap().unwrap();
    assert!(!stale.is_expired);
    assert_eq!(store.mark_expired(vec![missed.id], now).await.unwrap(), 1);

    let err = store
        .update(
            missed.id,
            UpdateReminder {
                is_completed: Some(true),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReminderError::Expired(_)));

    let stored = store.get(missed.id).await.unwrap().unwrap();
    assert!(stored.is_expired);
    assert!(!stored.is_completed);
}
