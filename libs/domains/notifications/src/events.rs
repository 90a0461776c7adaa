//! `MeetingCreatedEvent`, the contract between the meetings service and the
//! invitation worker.
//!
//! Serialized as flat camelCase JSON. `description` and `meetingLink` are
//! written as `null` when absent. Attendees keep their order and duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stream_worker::StreamJob;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingCreatedEvent {
    pub meeting_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub meeting_link: Option<String>,
    pub organizer_email: String,
    pub organizer_name: String,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl StreamJob for MeetingCreatedEvent {
    fn job_id(&self) -> String {
        self.meeting_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn event() -> MeetingCreatedEvent {
        MeetingCreatedEvent {
            meeting_id: 7,
            title: "Kickoff".to_string(),
            description: None,
            start_time: Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap(),
            meeting_link: None,
            organizer_email: "org@x.com".to_string(),
            organizer_name: "Org".to_string(),
            attendees: vec![
                "b@x.com".to_string(),
                "a@x.com".to_string(),
                "b@x.com".to_string(),
            ],
        }
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(event()).unwrap();
        assert_eq!(
            value,
            json!({
                "meetingId": 7,
                "title": "Kickoff",
                "description": null,
                "startTime": "2025-05-01T09:00:00Z",
                "endTime": "2025-05-01T10:00:00Z",
                "meetingLink": null,
                "organizerEmail": "org@x.com",
                "organizerName": "Org",
                "attendees": ["b@x.com", "a@x.com", "b@x.com"]
            })
        );
    }

    #[test]
    fn test_round_trip_keeps_attendee_order_and_duplicates() {
        let original = event();
        let json = serde_json::to_string(&original).unwrap();
        let decoded: MeetingCreatedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_accepts_offset_timestamps() {
        let decoded: MeetingCreatedEvent = serde_json::from_value(json!({
            "meetingId": 1,
            "title": "T",
            "description": "D",
            "startTime": "2025-05-01T16:00:00+07:00",
            "endTime": "2025-05-01T17:00:00+07:00",
            "meetingLink": "https://meet",
            "organizerEmail": "o@x.com",
            "organizerName": "O",
            "attendees": []
        }))
        .unwrap();

        assert_eq!(decoded.start_time, Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap());
        assert_eq!(decoded.description.as_deref(), Some("D"));
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let result: Result<MeetingCreatedEvent, _> =
            serde_json::from_value(json!({ "meetingId": 1, "title": "T" }));
        assert!(result.is_err());
    }
}
