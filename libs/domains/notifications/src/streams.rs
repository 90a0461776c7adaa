//! Stream definitions for the notifications domain.

use stream_worker::StreamDef;

/// Topic carrying `MeetingCreatedEvent`.
pub struct MeetingCreatedStream;

impl StreamDef for MeetingCreatedStream {
    const STREAM_NAME: &'static str = "meeting-created";
    const CONSUMER_GROUP: &'static str = "utility-service-group";
}
