use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{MeetingError, MeetingResult};
use crate::models::{CreateMeeting, Meeting, Organizer};
use crate::publisher::{MeetingEventPublisher, PublishOutcome};
use crate::repository::MeetingRepository;

/// A stored meeting and what happened to its event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMeeting {
    pub meeting: Meeting,
    pub publish: PublishOutcome,
}

/// Service layer for meetings
#[derive(Clone)]
pub struct MeetingService<R: MeetingRepository> {
    repository: Arc<R>,
    publisher: MeetingEventPublisher,
}

impl<R: MeetingRepository> MeetingService<R> {
    pub fn new(repository: R, publisher: MeetingEventPublisher) -> Self {
        Self {
            repository: Arc::new(repository),
            publisher,
        }
    }

    /// Validate, store, then announce the meeting.
    ///
    /// The meeting is stored even when the announcement fails; the outcome is
    /// returned alongside it.
    pub async fn create_meeting(
        &self,
        input: CreateMeeting,
        organizer: &Organizer,
    ) -> MeetingResult<CreatedMeeting> {
        input.validate_at(Utc::now())?;

        let meeting = self.repository.create(organizer.id, input).await?;
        let publish = self.publisher.publish(&meeting.created_event(organizer)).await;

        match &publish {
            PublishOutcome::Published { message_id } => info!(
                meeting_id = meeting.id,
                message_id = %message_id,
                attendees = meeting.attendees.len(),
                "Published meeting-created event"
            ),
            PublishOutcome::Skipped => {}
            PublishOutcome::Failed(reason) => error!(
                meeting_id = meeting.id,
                topic = %self.publisher.topic(),
                error = %reason,
                "Failed to publish meeting-created event, invitations will not be sent"
            ),
        }

        Ok(CreatedMeeting { meeting, publish })
    }

    pub async fn get_meeting(&self, id: i64) -> MeetingResult<Meeting> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(MeetingError::NotFound(id))
    }

    pub async fn list_for_organizer(&self, organizer_id: Uuid) -> MeetingResult<Vec<Meeting>> {
        self.repository.list_by_organizer(organizer_id).await
    }

    pub async fn delete_meeting(&self, id: i64) -> MeetingResult<()> {
        if !self.repository.delete(id).await? {
            return Err(MeetingError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockMeetingRepository;
    use async_trait::async_trait;
    use chrono::Duration;
    use mockall::predicate;
    use std::sync::Mutex;
    use stream_worker::{EventPublisher, PublishAck, StreamError};

    #[derive(Default)]
    struct Outbox {
        payloads: Mutex<Vec<String>>,
        down: bool,
    }

    #[async_trait]
    impl EventPublisher for Outbox {
        async fn publish(
            &self,
            _topic: &str,
            _key: &str,
            payload: &str,
        ) -> Result<PublishAck, StreamError> {
            if self.down {
                return Err(StreamError::transient("connection refused"));
            }
            self.payloads.lock().unwrap().push(payload.to_string());
            Ok(PublishAck {
                message_id: "1-0".to_string(),
                deduplicated: false,
                replicas: None,
            })
        }
    }

    fn organizer() -> Organizer {
        Organizer::new(Uuid::new_v4(), "lead@x.com", "Team Lead")
    }

    fn input() -> CreateMeeting {
        let start = Utc::now() + Duration::days(1);
        CreateMeeting {
            title: "Roadmap".to_string(),
            description: Some("Q3 roadmap".to_string()),
            start_time: start,
            end_time: start + Duration::hours(1),
            meeting_link: Some("https://meet.example.com/roadmap".to_string()),
            attendees: vec!["a@x.com".to_string(), "b@x.com".to_string()],
        }
    }

    fn stored(organizer_id: Uuid, input: CreateMeeting) -> Meeting {
        Meeting {
            id: 17,
            organizer_id,
            title: input.title,
            description: input.description,
            start_time: input.start_time,
            end_time: input.end_time,
            meeting_link: input.meeting_link,
            attendees: input.attendees,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_publishes_event() {
        let organizer = organizer();
        let mut repo = MockMeetingRepository::new();
        repo.expect_create()
            .with(predicate::eq(organizer.id), predicate::always())
            .times(1)
            .returning(|id, input| Ok(stored(id, input)));

        let outbox = Arc::new(Outbox::default());
        let service = MeetingService::new(
            repo,
            MeetingEventPublisher::new(outbox.clone(), "meeting-created"),
        );

        let created = service.create_meeting(input(), &organizer).await.unwrap();
        assert_eq!(created.meeting.id, 17);
        assert!(matches!(created.publish, PublishOutcome::Published { .. }));

        let payloads = outbox.payloads.lock().unwrap();
        let event: serde_json::Value = serde_json::from_str(&payloads[0]).unwrap();
        assert_eq!(event["meetingId"], 17);
        assert_eq!(event["organizerEmail"], "lead@x.com");
        assert_eq!(event["organizerName"], "Team Lead");
        assert_eq!(event["attendees"], serde_json::json!(["a@x.com", "b@x.com"]));
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_meeting() {
        let mut repo = MockMeetingRepository::new();
        repo.expect_create()
            .times(1)
            .returning(|id, input| Ok(stored(id, input)));

        let outbox = Arc::new(Outbox {
            down: true,
            ..Default::default()
        });
        let service = MeetingService::new(
            repo,
            MeetingEventPublisher::new(outbox, "meeting-created"),
        );

        let created = service.create_meeting(input(), &organizer()).await.unwrap();
        assert_eq!(created.meeting.id, 17);
        assert!(matches!(created.publish, PublishOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_no_broker_skips_publish() {
        let mut repo = MockMeetingRepository::new();
        repo.expect_create()
            .returning(|id, input| Ok(stored(id, input)));

        let service = MeetingService::new(repo, MeetingEventPublisher::disabled());
        let created = service.create_meeting(input(), &organizer()).await.unwrap();
        assert_eq!(created.publish, PublishOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_invalid_input_is_not_stored() {
        let mut repo = MockMeetingRepository::new();
        repo.expect_create().never();

        let service = MeetingService::new(repo, MeetingEventPublisher::disabled());
        let mut bad = input();
        bad.attendees = vec![];

        let err = service.create_meeting(bad, &organizer()).await.unwrap_err();
        assert!(matches!(err, MeetingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_meeting() {
        let mut repo = MockMeetingRepository::new();
        repo.expect_delete()
            .with(predicate::eq(99))
            .returning(|_| Ok(false));

        let service = MeetingService::new(repo, MeetingEventPublisher::disabled());
        assert!(matches!(
            service.delete_meeting(99).await,
            Err(MeetingError::NotFound(99))
        ));
    }
}
