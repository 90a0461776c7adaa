use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000000_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reminders::Table)
                    .if_not_exists()
                    .col(pk_uuid(Reminders::Id))
                    .col(uuid(Reminders::UserId))
                    .col(string_len(Reminders::Title, 255))
                    .col(text_null(Reminders::Note))
                    .col(timestamp_with_time_zone(Reminders::ReminderTime))
                    .col(boolean(Reminders::IsEmailSent).default(false))
                    .col(timestamp_with_time_zone_null(Reminders::EmailSentAt))
                    .col(boolean(Reminders::IsExpired).default(false))
                    .col(boolean(Reminders::IsCompleted).default(false))
                    .col(
                        timestamp_with_time_zone(Reminders::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Reminders::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reminders_user_id")
                            .from(Reminders::Table, Reminders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reminders_user_id")
                    .table(Reminders::Table)
                    .col(Reminders::UserId)
                    .to_owned(),
            )
            .await?;

        // Both poller passes range-scan on reminder_time among unexpired rows
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE INDEX IF NOT EXISTS idx_reminders_pending_time
                    ON reminders (reminder_time)
                    WHERE is_expired = false
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reminders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Reminders {
    Table,
    Id,
    UserId,
    Title,
    Note,
    ReminderTime,
    IsEmailSent,
    EmailSentAt,
    IsExpired,
    IsCompleted,
    CreatedAt,
    UpdatedAt,
}
