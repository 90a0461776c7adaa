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
                    .table(Meetings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Meetings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(uuid(Meetings::OrganizerId))
                    .col(string_len(Meetings::Title, 255))
                    .col(text_null(Meetings::Description))
                    .col(timestamp_with_time_zone(Meetings::StartTime))
                    .col(timestamp_with_time_zone(Meetings::EndTime))
                    .col(string_len_null(Meetings::MeetingLink, 500))
                    .col(json_binary(Meetings::Attendees))
                    .col(
                        timestamp_with_time_zone(Meetings::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Meetings::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meetings_organizer_id")
                            .from(Meetings::Table, Meetings::OrganizerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meetings_organizer_id")
                    .table(Meetings::Table)
                    .col(Meetings::OrganizerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Meetings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Meetings {
    Table,
    Id,
    OrganizerId,
    Title,
    Description,
    StartTime,
    EndTime,
    MeetingLink,
    Attendees,
    CreatedAt,
    UpdatedAt,
}
