use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::{
    entity,
    error::MeetingResult,
    models::{CreateMeeting, Meeting},
    repository::MeetingRepository,
};

pub struct PgMeetingRepository {
    db: DatabaseConnection,
}

impl PgMeetingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MeetingRepository for PgMeetingRepository {
    async fn create(&self, organizer_id: Uuid, input: CreateMeeting) -> MeetingResult<Meeting> {
        let model = entity::ActiveModel::for_insert(organizer_id, input)
            .insert(&self.db)
            .await?;

        tracing::info!(meeting_id = model.id, organizer_id = %organizer_id, "Created meeting");
        Meeting::try_from(model)
    }

    async fn get_by_id(&self, id: i64) -> MeetingResult<Option<Meeting>> {
        entity::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Meeting::try_from)
            .transpose()
    }

    async fn list_by_organizer(&self, organizer_id: Uuid) -> MeetingResult<Vec<Meeting>> {
        entity::Entity::find()
            .filter(entity::Column::OrganizerId.eq(organizer_id))
            .order_by_asc(entity::Column::StartTime)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Meeting::try_from)
            .collect()
    }

    async fn delete(&self, id: i64) -> MeetingResult<bool> {
        let result = entity::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
