use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;

use crate::error::MeetingError;
use crate::models::{CreateMeeting, Meeting};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "meetings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub organizer_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub start_time: DateTimeWithTimeZone,
    pub end_time: DateTimeWithTimeZone,
    pub meeting_link: Option<String>,
    /// JSON array of attendee emails, in request order
    #[sea_orm(column_type = "JsonBinary")]
    pub attendees: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Meeting {
    type Error = MeetingError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let attendees: Vec<String> = serde_json::from_value(model.attendees).map_err(|e| {
            MeetingError::Database(format!("meeting {} has malformed attendees: {}", model.id, e))
        })?;

        Ok(Self {
            id: model.id,
            organizer_id: model.organizer_id,
            title: model.title,
            description: model.description,
            start_time: model.start_time.into(),
            end_time: model.end_time.into(),
            meeting_link: model.meeting_link,
            attendees,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.map(Into::into),
        })
    }
}

impl ActiveModel {
    pub fn for_insert(organizer_id: Uuid, input: CreateMeeting) -> Self {
        ActiveModel {
            id: NotSet,
            organizer_id: Set(organizer_id),
            title: Set(input.title),
            description: Set(input.description),
            start_time: Set(input.start_time.into()),
            end_time: Set(input.end_time.into()),
            meeting_link: Set(input.meeting_link),
            attendees: Set(Json::from(input.attendees)),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        }
    }
}
