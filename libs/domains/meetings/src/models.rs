use chrono::{DateTime, Utc};
use domain_notifications::MeetingCreatedEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::error::{MeetingError, MeetingResult};

fn validate_attendees(attendees: &[String]) -> Result<(), ValidationError> {
    match attendees.iter().find(|a| !a.validate_email()) {
        Some(bad) => {
            let mut err = ValidationError::new("email");
            err.message = Some(format!("invalid attendee email: {}", bad).into());
            Err(err)
        }
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: i64,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub meeting_link: Option<String>,
    pub attendees: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for scheduling a meeting
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMeeting {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    #[validate(length(max = 500))]
    pub meeting_link: Option<String>,

    #[validate(
        length(min = 1, message = "at least one attendee is required"),
        custom(function = "validate_attendees")
    )]
    pub attendees: Vec<String>,
}

impl CreateMeeting {
    /// Field rules plus the schedule rules, which depend on the clock.
    pub fn validate_at(&self, now: DateTime<Utc>) -> MeetingResult<()> {
        self.validate()?;

        if self.start_time <= now {
            return Err(MeetingError::Validation(
                "start time must be in the future".to_string(),
            ));
        }
        if self.end_time <= self.start_time {
            return Err(MeetingError::Validation(
                "end time must be after start time".to_string(),
            ));
        }
        Ok(())
    }
}

/// Who is creating the meeting, as named in the invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organizer {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl Organizer {
    pub fn new(id: Uuid, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            name: name.into(),
        }
    }
}

impl Meeting {
    /// The fact published once this meeting is stored.
    pub fn created_event(&self, organizer: &Organizer) -> MeetingCreatedEvent {
        MeetingCreatedEvent {
            meeting_id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            meeting_link: self.meeting_link.clone(),
            organizer_email: organizer.email.clone(),
            organizer_name: organizer.name.clone(),
            attendees: self.attendees.clone(),
        }
    }
}
