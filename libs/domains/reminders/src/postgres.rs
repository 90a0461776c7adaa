use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entity::{reminder, user};
use crate::error::{ReminderError, ReminderResult};
use crate::models::{CreateReminder, DueReminder, Reminder, UpdateReminder};
use crate::store::ReminderStore;

pub struct PgReminderStore {
    db: DatabaseConnection,
}

impl PgReminderStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateReminder,
        now: DateTime<Utc>,
    ) -> ReminderResult<Reminder> {
        let reminder = Reminder::new(user_id, input, now)?;
        let model = reminder::ActiveModel::from(reminder).insert(&self.db).await?;

        tracing::info!(reminder_id = %model.id, user_id = %user_id, "Created reminder");
        Ok(model.into())
    }

    pub async fn get(&self, id: Uuid) -> ReminderResult<Option<Reminder>> {
        let model = reminder::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    /// Apply a user edit.
    ///
    /// Only the edited columns are written, and only while the row is not
    /// expired, so a flag set by the poller after the read is never reverted.
    /// The sent flag is cleared only when `reminder_time` actually changes.
    pub async fn update(
        &self,
        id: Uuid,
        update: UpdateReminder,
        now: DateTime<Utc>,
    ) -> ReminderResult<Reminder> {
        let mut reminder = self.get(id).await?.ok_or(ReminderError::NotFound(id))?;
        let previous_time = reminder.reminder_time;
        reminder.apply_update(update, now)?;

        let mut query = reminder::Entity::update_many()
            .col_expr(reminder::Column::Title, Expr::value(reminder.title))
            .col_expr(reminder::Column::Note, Expr::value(reminder.note))
            .col_expr(reminder::Column::IsCompleted, Expr::value(reminder.is_completed))
            .col_expr(reminder::Column::UpdatedAt, Expr::value(now));
        if reminder.reminder_time != previous_time {
            query = query
                .col_expr(reminder::Column::ReminderTime, Expr::value(reminder.reminder_time))
                .col_expr(reminder::Column::IsEmailSent, Expr::value(false))
                .col_expr(reminder::Column::EmailSentAt, Expr::value(None::<DateTime<Utc>>));
        }

        let result = query
            .filter(reminder::Column::Id.eq(id))
            .filter(reminder::Column::IsExpired.eq(false))
            .exec(&self.db)
            .await?;

        let stored = self.get(id).await?.ok_or(ReminderError::NotFound(id))?;
        if result.rows_affected == 0 {
            // expired between the read and the write
            debug!(reminder_id = %id, "Edit lost to a concurrent expiry");
            return Err(ReminderError::Expired(id));
        }
        Ok(stored)
    }

    pub async fn delete(&self, id: Uuid) -> ReminderResult<bool> {
        let result = reminder::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    async fn find_due_for_notification(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> ReminderResult<Vec<DueReminder>> {
        let rows = reminder::Entity::find()
            .find_also_related(user::Entity)
            .filter(reminder::Column::IsEmailSent.eq(false))
            .filter(reminder::Column::IsExpired.eq(false))
            .filter(reminder::Column::IsCompleted.eq(false))
            .filter(reminder::Column::ReminderTime.gt(now))
            .filter(reminder::Column::ReminderTime.lte(now + window))
            .order_by_asc(reminder::Column::ReminderTime)
            .all(&self.db)
            .await?;

        let due = rows
            .into_iter()
            .filter_map(|(model, owner)| match owner {
                Some(owner) => Some(DueReminder {
                    reminder: model.into(),
                    owner_email: owner.email,
                }),
                None => {
                    warn!(reminder_id = %model.id, "Reminder has no owner row, skipping");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(count = due.len(), "Loaded reminders due for notification");
        Ok(due)
    }

    async fn find_due_for_expiry(&self, now: DateTime<Utc>) -> ReminderResult<Vec<Reminder>> {
        let models = reminder::Entity::find()
            .filter(reminder::Column::IsExpired.eq(false))
            .filter(reminder::Column::ReminderTime.lt(now))
            .order_by_asc(reminder::Column::ReminderTime)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn mark_notified(&self, id: Uuid, sent_at: DateTime<Utc>) -> ReminderResult<bool> {
        let result = reminder::Entity::update_many()
            .col_expr(reminder::Column::IsEmailSent, Expr::value(true))
            .col_expr(reminder::Column::EmailSentAt, Expr::value(sent_at))
            .col_expr(reminder::Column::UpdatedAt, Expr::value(sent_at))
            .filter(reminder::Column::Id.eq(id))
            .filter(reminder::Column::IsEmailSent.eq(false))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn mark_expired(&self, ids: Vec<Uuid>, now: DateTime<Utc>) -> ReminderResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = reminder::Entity::update_many()
            .col_expr(reminder::Column::IsExpired, Expr::value(true))
            .col_expr(reminder::Column::UpdatedAt, Expr::value(now))
            .filter(reminder::Column::Id.is_in(ids))
            .filter(reminder::Column::IsExpired.eq(false))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
