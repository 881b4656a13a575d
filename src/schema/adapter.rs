//! Payload decoding
//!
//! Turns request bodies into [`EventPayload`] values. Shape errors are reported
//! as [`ScoringError::Decode`] with the offending location so callers can surface
//! a human-readable reason.

use crate::error::ScoringError;
use crate::schema::raw_event::{EventBatch, EventPayload};
use serde_json::Value;

/// Adapter for decoding request bodies into event payloads
pub struct PayloadAdapter;

impl PayloadAdapter {
    /// Parse a JSON document holding either one batch or an array of batches
    pub fn parse(json: &str) -> Result<EventPayload, ScoringError> {
        let value: Value = serde_json::from_str(json.trim())
            .map_err(|e| ScoringError::Decode(format!("JSON decode failed: {}", e)))?;
        Self::from_value(value)
    }

    /// Parse NDJSON where every non-empty line is one batch
    pub fn parse_ndjson(ndjson: &str) -> Result<EventPayload, ScoringError> {
        let mut batches = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(trimmed).map_err(|e| {
                ScoringError::Decode(format!("Failed to parse line {}: {}", line_num + 1, e))
            })?;
            let batch = decode_batch(value)
                .map_err(|e| ScoringError::Decode(format!("line {}: {}", line_num + 1, e)))?;
            batches.push(batch);
        }
        Ok(EventPayload::Batches(batches))
    }

    /// Decode an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<EventPayload, ScoringError> {
        match value {
            Value::Array(items) => {
                let mut batches = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let batch = decode_batch(item).map_err(|e| {
                        ScoringError::Decode(format!("batch {}: {}", index, e))
                    })?;
                    batches.push(batch);
                }
                Ok(EventPayload::Batches(batches))
            }
            Value::Object(_) => decode_batch(value)
                .map(EventPayload::Single)
                .map_err(ScoringError::Decode),
            other => Err(ScoringError::Decode(format!(
                "expected an event batch object or an array of batches, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn decode_batch(value: Value) -> Result<EventBatch, String> {
    if !value.is_object() {
        return Err(format!(
            "expected an object with an `events` list, found {}",
            json_kind(&value)
        ));
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_array() {
        let json = r#"[
            {"events": [
                {"hem_sha256": "a", "event_type": "copy", "event_timestamp": "2024-01-15T08:30:00Z"},
                {"hem_sha256": "b", "event_type": "page_view"}
            ]},
            {"events": [{"hem_sha256": "a", "event_type": "all_clicks"}]}
        ]"#;

        let payload = PayloadAdapter::parse(json).unwrap();
        assert_eq!(payload.batches().len(), 2);
        assert_eq!(payload.event_count(), 3);
    }

    #[test]
    fn test_parse_single_batch() {
        let payload = PayloadAdapter::parse(r#"{"events": []}"#).unwrap();
        assert_eq!(payload, EventPayload::Single(EventBatch::default()));
    }

    #[test]
    fn test_invalid_json() {
        let err = PayloadAdapter::parse("not valid json").unwrap_err();
        assert!(matches!(err, ScoringError::Decode(_)));
        assert!(err.to_string().contains("JSON decode failed"));
    }

    #[test]
    fn test_wrong_shape() {
        let err = PayloadAdapter::parse("42").unwrap_err();
        assert!(err.to_string().contains("found a number"));

        let err = PayloadAdapter::parse(r#"[{"events": []}, "oops"]"#).unwrap_err();
        assert!(err.to_string().contains("batch 1"));

        let err = PayloadAdapter::parse(r#"{"events": {"hem_sha256": "a"}}"#).unwrap_err();
        assert!(matches!(err, ScoringError::Decode(_)));
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"{"events": [{"hem_sha256": "a", "event_type": "copy"}]}

{"events": [{"hem_sha256": "b", "event_type": "copy"}]}
"#;
        let payload = PayloadAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(payload.batches().len(), 2);

        let err = PayloadAdapter::parse_ndjson("{\"events\": []}\n[1]").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
