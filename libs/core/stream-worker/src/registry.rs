//! Stream registry types and definitions.
//!
//! - `StreamDef` for topic definitions shared by publisher and consumer
//! - `MessageKey` for the field names every entry carries

use strum::{AsRefStr, Display, EnumString};

/// Field names written into each stream entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKey {
    /// Publisher-chosen key (a fresh UUID per publish).
    Key,
    /// The serialized event (JSON).
    Payload,
    /// RFC 3339 timestamp of the publish call.
    PublishedAt,
}

/// Stream definition trait.
///
/// Each domain implements this for the topics it owns so the publisher and
/// the consume loop agree on names and trimming.
///
/// # Example
///
/// ```rust,ignore
/// use stream_worker::StreamDef;
///
/// pub struct MeetingCreatedStream;
///
/// impl StreamDef for MeetingCreatedStream {
///     const STREAM_NAME: &'static str = "meeting-created";
///     const CONSUMER_GROUP: &'static str = "utility-service-group";
/// }
/// ```
pub trait StreamDef: Send + Sync {
    /// The Redis stream key (the topic).
    const STREAM_NAME: &'static str;

    /// Default consumer group for this stream.
    const CONSUMER_GROUP: &'static str;

    /// Maximum stream length before auto-trim (MAXLEN ~).
    const MAX_LENGTH: i64 = 100_000;

    fn stream_name() -> &'static str {
        Self::STREAM_NAME
    }

    fn consumer_group() -> &'static str {
        Self::CONSUMER_GROUP
    }
}

/// Key of the idempotency marker for one publish on `topic`.
///
/// The topic is wrapped in a hash tag so marker and stream share a cluster slot.
pub fn dedup_key(topic: &str, key: &str) -> String {
    format!("{{{}}}:dedup:{}", topic, key)
}
