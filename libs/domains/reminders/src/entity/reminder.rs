use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

use crate::models::Reminder;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reminders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub reminder_time: DateTimeWithTimeZone,
    pub is_email_sent: bool,
    pub email_sent_at: Option<DateTimeWithTimeZone>,
    pub is_expired: bool,
    pub is_completed: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Reminder {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            note: model.note,
            reminder_time: model.reminder_time.into(),
            is_email_sent: model.is_email_sent,
            email_sent_at: model.email_sent_at.map(Into::into),
            is_expired: model.is_expired,
            is_completed: model.is_completed,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.map(Into::into),
        }
    }
}

impl From<Reminder> for ActiveModel {
    fn from(reminder: Reminder) -> Self {
        ActiveModel {
            id: Set(reminder.id),
            user_id: Set(reminder.user_id),
            title: Set(reminder.title),
            note: Set(reminder.note),
            reminder_time: Set(reminder.reminder_time.into()),
            is_email_sent: Set(reminder.is_email_sent),
            email_sent_at: Set(reminder.email_sent_at.map(Into::into)),
            is_expired: Set(reminder.is_expired),
            is_completed: Set(reminder.is_completed),
            created_at: Set(reminder.created_at.into()),
            updated_at: Set(reminder.updated_at.map(Into::into)),
        }
    }
}
