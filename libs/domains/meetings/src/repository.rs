use async_trait::async_trait;
use uuid::Uuid;

use crate::error::MeetingResult;
use crate::models::{CreateMeeting, Meeting};

/// Persistence for meetings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    /// Store a validated meeting and return it with its assigned id
    async fn create(&self, organizer_id: Uuid, input: CreateMeeting) -> MeetingResult<Meeting>;

    async fn get_by_id(&self, id: i64) -> MeetingResult<Option<Meeting>>;

    async fn list_by_organizer(&self, organizer_id: Uuid) -> MeetingResult<Vec<Meeting>>;

    async fn delete(&self, id: i64) -> MeetingResult<bool>;
}
