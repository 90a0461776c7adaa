//! Stream message wrapper
//!
//! One entry read from a topic: its id, the publisher's key and payload, and
//! delivery metadata.

use crate::error::StreamError;
use crate::registry::MessageKey;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// A message received from a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMessage {
    /// Redis stream entry ID (e.g., "1234567890123-0")
    pub id: String,

    /// Publisher-assigned key, if present
    pub key: Option<String>,

    /// Raw payload; `None` when the field is missing (poison)
    pub payload: Option<String>,

    /// When the publisher sent it
    pub published_at: Option<DateTime<Utc>>,

    /// When the entry was appended (parsed from the stream ID)
    pub timestamp: DateTime<Utc>,

    /// True when read back from this consumer's pending list
    pub redelivered: bool,
}

impl StreamMessage {
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        let id = id.into();
        let timestamp = parse_timestamp(&id);
        Self {
            id,
            key: None,
            payload: Some(payload.into()),
            published_at: None,
            timestamp,
            redelivered: false,
        }
    }

    /// Build from the field map of a stream entry.
    pub fn from_fields(id: impl Into<String>, fields: &HashMap<String, String>) -> Self {
        let id = id.into();
        let timestamp = parse_timestamp(&id);
        Self {
            key: fields.get(MessageKey::Key.as_ref()).cloned(),
            payload: fields.get(MessageKey::Payload.as_ref()).cloned(),
            published_at: fields
                .get(MessageKey::PublishedAt.as_ref())
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            id,
            timestamp,
            redelivered: false,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn redelivered(mut self, redelivered: bool) -> Self {
        self.redelivered = redelivered;
        self
    }

    /// Deserialize the payload. Missing or malformed payloads are `Serialization` errors.
    pub fn decode<J: DeserializeOwned>(&self) -> Result<J, StreamError> {
        let payload = self.payload.as_deref().ok_or_else(|| {
            StreamError::Serialization(format!("entry {} has no '{}' field", self.id, MessageKey::Payload))
        })?;
        Ok(serde_json::from_str(payload)?)
    }

    /// Get how long ago the entry was appended
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.timestamp
    }
}

/// Stream IDs are in format "timestamp_ms-sequence"
fn parse_timestamp(stream_id: &str) -> DateTime<Utc> {
    stream_id
        .split('-')
        .next()
        .and_then(|ts| ts.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}
