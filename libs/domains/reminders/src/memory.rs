//! In-process store for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ReminderError, ReminderResult};
use crate::models::{DueReminder, Reminder, UpdateReminder};
use crate::store::ReminderStore;

#[derive(Default)]
pub struct InMemoryReminderStore {
    reminders: RwLock<HashMap<Uuid, Reminder>>,
    users: RwLock<HashMap<Uuid, String>>,
}

impl InMemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user's address. Reminders of unknown users are never notified.
    pub async fn add_user(&self, user_id: Uuid, email: impl Into<String>) {
        self.users.write().await.insert(user_id, email.into());
    }

    pub async fn insert(&self, reminder: Reminder) {
        self.reminders.write().await.insert(reminder.id, reminder);
    }

    pub async fn get(&self, id: Uuid) -> Option<Reminder> {
        self.reminders.read().await.get(&id).cloned()
    }

    pub async fn update(
        &self,
        id: Uuid,
        update: UpdateReminder,
        now: DateTime<Utc>,
    ) -> ReminderResult<Reminder> {
        let mut reminders = self.reminders.write().await;
        let reminder = reminders.get_mut(&id).ok_or(ReminderError::NotFound(id))?;
        reminder.apply_update(update, now)?;
        Ok(reminder.clone())
    }

    pub async fn delete(&self, id: Uuid) -> bool {
        self.reminders.write().await.remove(&id).is_some()
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn find_due_for_notification(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> ReminderResult<Vec<DueReminder>> {
        let reminders = self.reminders.read().await;
        let users = self.users.read().await;

        let mut due: Vec<DueReminder> = reminders
            .values()
            .filter(|r| r.is_due_for_notification(now, window))
            .filter_map(|r| {
                users.get(&r.user_id).map(|email| DueReminder {
                    reminder: r.clone(),
                    owner_email: email.clone(),
                })
            })
            .collect();
        due.sort_by_key(|d| d.reminder.reminder_time);
        Ok(due)
    }

    async fn find_due_for_expiry(&self, now: DateTime<Utc>) -> ReminderResult<Vec<Reminder>> {
        let reminders = self.reminders.read().await;
        let mut expired: Vec<Reminder> = reminders
            .values()
            .filter(|r| r.is_due_for_expiry(now))
            .cloned()
            .collect();
        expired.sort_by_key(|r| r.reminder_time);
        Ok(expired)
    }

    async fn mark_notified(&self, id: Uuid, sent_at: DateTime<Utc>) -> ReminderResult<bool> {
        let mut reminders = self.reminders.write().await;
        Ok(reminders
            .get_mut(&id)
            .map(|r| r.mark_notified(sent_at))
            .unwrap_or(false))
    }

    async fn mark_expired(&self, ids: Vec<Uuid>, now: DateTime<Utc>) -> ReminderResult<u64> {
        let mut reminders = self.reminders.write().await;
        let mut changed = 0;
        for id in ids {
            if let Some(reminder) = reminders.get_mut(&id)
                && reminder.mark_expired(now)
            {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateReminder;

    async fn seeded(now: DateTime<Utc>, offset: Duration) -> (InMemoryReminderStore, Uuid) {
        let store = InMemoryReminderStore::new();
        let user_id = Uuid::new_v4();
        store.add_user(user_id, "owner@x.com").await;

        let reminder = Reminder::new(
            user_id,
            CreateReminder {
                title: "Pay rent".to_string(),
                note: None,
                reminder_time: now + offset,
            },
            now,
        )
        .unwrap();
        let id = reminder.id;
        store.insert(reminder).await;
        (store, id)
    }

    #[tokio::test]
    async fn test_due_reminder_carries_owner_email() {
        let now = Utc::now();
        let (store, id) = seeded(now, Duration::minutes(5)).await;

        let due = store
            .find_due_for_notification(now, Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].reminder.id, id);
        assert_eq!(due[0].owner_email, "owner@x.com");
    }

    #[tokio::test]
    async fn test_mark_notified_only_once() {
        let now = Utc::now();
        let (store, id) = seeded(now, Duration::minutes(5)).await;

        assert!(store.mark_notified(id, now).await.unwrap());
        assert!(!store.mark_notified(id, now).await.unwrap());
        assert!(!store.mark_notified(Uuid::new_v4(), now).await.unwrap());
        assert_eq!(store.get(id).await.unwrap().email_sent_at, Some(now));
    }

    #[tokio::test]
    async fn test_mark_expired_counts_changes_only() {
        let now = Utc::now();
        let (store, id) = seeded(now, -Duration::minutes(5)).await;

        assert_eq!(store.mark_expired(vec![id], now).await.unwrap(), 1);
        assert_eq!(store.mark_expired(vec![id], now).await.unwrap(), 0);
        assert!(store.find_due_for_expiry(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_reminder() {
        let store = InMemoryReminderStore::new();
        let id = Uuid::new_v4();

        let err = store
            .update(id, UpdateReminder::default(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReminderError::NotFound(missing) if missing == id));
    }
}
