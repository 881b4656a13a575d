//! Inbound interaction event schema
//!
//! Events arrive grouped in batches of the form `{"events": [...]}`. A request
//! payload is either one batch or a sequence of batches. Every event field is
//! optional at the decode layer: missing identity, event type or timestamp is a
//! per-event validation gap handled by the normalizer, not a decode failure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resolution attribute holding the user's personal email(s)
pub const PERSONAL_EMAIL_FIELD: &str = "PERSONAL_EMAILS";

/// A single user interaction event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Hashed identity of the user (opaque key)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hem_sha256: Option<String>,
    /// Interaction type (page_view, copy, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// ISO-8601 event timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_timestamp: Option<String>,
    /// Resolved attributes for the identity.
    ///
    /// Values may be a string, a comma-delimited string, or a list of strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<BTreeMap<String, serde_json::Value>>,
}

/// A batch of events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// A decoded request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// A sequence of batches
    Batches(Vec<EventBatch>),
    /// A single batch
    Single(EventBatch),
}

impl Default for EventPayload {
    fn default() -> Self {
        EventPayload::Batches(Vec::new())
    }
}

impl From<EventBatch> for EventPayload {
    fn from(batch: EventBatch) -> Self {
        EventPayload::Single(batch)
    }
}

impl From<Vec<EventBatch>> for EventPayload {
    fn from(batches: Vec<EventBatch>) -> Self {
        EventPayload::Batches(batches)
    }
}

impl From<Vec<RawEvent>> for EventPayload {
    fn from(events: Vec<RawEvent>) -> Self {
        EventPayload::Single(EventBatch { events })
    }
}

impl EventPayload {
    /// Batches contained in this payload, in input order
    pub fn batches(&self) -> &[EventBatch] {
        match self {
            EventPayload::Batches(batches) => batches,
            EventPayload::Single(batch) => std::slice::from_ref(batch),
        }
    }

    /// Iterate over every event across all batches, in input order
    pub fn events(&self) -> impl Iterator<Item = &RawEvent> {
        self.batches().iter().flat_map(|b| b.events.iter())
    }

    /// Total number of raw events across all batches
    pub fn event_count(&self) -> usize {
        self.batches().iter().map(|b| b.events.len()).sum()
    }
}

impl RawEvent {
    /// Create an event with identity and type set
    pub fn new(hem_sha256: impl Into<String>, event_type: impl Into<String>) -> Self {
        RawEvent {
            hem_sha256: Some(hem_sha256.into()),
            event_type: Some(event_type.into()),
            event_timestamp: None,
            resolution: None,
        }
    }

    /// Set the event timestamp
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.event_timestamp = Some(timestamp.into());
        self
    }

    /// Set the personal email resolution attribute
    pub fn with_email(self, email: impl Into<String>) -> Self {
        self.with_resolution(PERSONAL_EMAIL_FIELD, serde_json::Value::String(email.into()))
    }

    /// Add a resolution attribute
    pub fn with_resolution(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.resolution
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    /// Check the fields both pipelines depend on.
    ///
    /// Grouping requires identity and event type; scoring additionally requires
    /// a timestamp. Timestamp parseability is checked by the normalizer.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_blank(&self.hem_sha256) {
            return Err(ValidationError::MissingIdentity);
        }
        if is_blank(&self.event_type) {
            return Err(ValidationError::MissingEventType);
        }
        if is_blank(&self.event_timestamp) {
            return Err(ValidationError::MissingTimestamp);
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Per-event validation gaps
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing hem_sha256")]
    MissingIdentity,

    #[error("missing event_type")]
    MissingEventType,

    #[error("missing event_timestamp")]
    MissingTimestamp,
}
