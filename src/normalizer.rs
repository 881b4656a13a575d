//! Event normalization
//!
//! Flattens a batch payload into [`NormalizedEvent`]s. Events without an
//! identity hash or event type are dropped here so that neither pipeline ever
//! sees them. Resolution attributes are reduced to their primary value and kept
//! under lower-cased keys; no other raw fields are retained.

use crate::schema::{EventPayload, RawEvent, PERSONAL_EMAIL_FIELD};
use crate::types::NormalizedEvent;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Separator between values in multi-valued resolution fields
const VALUE_SEPARATOR: char = ',';

/// Output column names that resolution attributes may not shadow
const RESERVED_KEYS: [&str; 7] = [
    "hem_sha256",
    "event_type",
    "event_timestamp",
    "personal_emails",
    "events_collected",
    "event_count",
    "first_event_timestamp",
];

/// Counts collected while normalizing a payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationStats {
    /// Raw events seen across all batches
    pub total_events: usize,
    /// Events kept (identity and type present)
    pub kept_events: usize,
    /// Dropped for a missing or blank identity hash
    pub missing_identity: usize,
    /// Dropped for a missing or blank event type
    pub missing_event_type: usize,
    /// Kept events without a timestamp (excluded from scoring)
    pub missing_timestamp: usize,
    /// Kept events whose timestamp could not be parsed (excluded from scoring)
    pub unparseable_timestamp: usize,
}

impl NormalizationStats {
    /// Events that the scoring pipeline will use
    pub fn scorable_events(&self) -> usize {
        self.kept_events - self.missing_timestamp - self.unparseable_timestamp
    }
}

/// Normalizer for raw interaction events
pub struct EventNormalizer;

impl EventNormalizer {
    /// Flatten every batch into normalized events, in input order
    pub fn normalize(payload: &EventPayload) -> Vec<NormalizedEvent> {
        Self::normalize_with_stats(payload).0
    }

    /// Flatten every batch and report what was dropped
    pub fn normalize_with_stats(payload: &EventPayload) -> (Vec<NormalizedEvent>, NormalizationStats) {
        let mut stats = NormalizationStats::default();
        let mut normalized = Vec::with_capacity(payload.event_count());

        for (index, event) in payload.events().enumerate() {
            stats.total_events += 1;

            let Some(hem_sha256) = non_blank(&event.hem_sha256) else {
                stats.missing_identity += 1;
                debug!(index, "dropping event without hem_sha256");
                continue;
            };
            let Some(event_type) = non_blank(&event.event_type) else {
                stats.missing_event_type += 1;
                debug!(index, hem_sha256, "dropping event without event_type");
                continue;
            };

            let raw_timestamp = non_blank(&event.event_timestamp);
            let event_timestamp = match raw_timestamp {
                Some(raw) => {
                    let parsed = parse_timestamp(raw);
                    if parsed.is_none() {
                        stats.unparseable_timestamp += 1;
                        debug!(index, hem_sha256, timestamp = raw, "unparseable event_timestamp");
                    }
                    parsed
                }
                None => {
                    stats.missing_timestamp += 1;
                    None
                }
            };

            let (personal_email, attributes) = split_resolution(event);

            normalized.push(NormalizedEvent {
                hem_sha256: hem_sha256.to_string(),
                event_type: event_type.to_string(),
                event_timestamp,
                raw_timestamp: raw_timestamp.map(str::to_string),
                personal_email,
                attributes,
            });
            stats.kept_events += 1;
        }

        debug!(
            total = stats.total_events,
            kept = stats.kept_events,
            missing_identity = stats.missing_identity,
            missing_event_type = stats.missing_event_type,
            "normalized event payload"
        );

        (normalized, stats)
    }
}

/// Extract the primary value of a possibly multi-valued field.
///
/// A comma-delimited string yields the trimmed text before the first comma; a
/// list yields the primary value of its first element. Blank results are `None`.
pub fn primary_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => first_value(s),
        Value::Array(items) => items.first().and_then(primary_value),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Object(_) => None,
    }
}

fn first_value(s: &str) -> Option<String> {
    let head = match s.split_once(VALUE_SEPARATOR) {
        Some((head, _)) => head,
        None => s,
    };
    let head = head.trim();
    if head.is_empty() {
        None
    } else {
        Some(head.to_string())
    }
}

fn split_resolution(event: &RawEvent) -> (Option<String>, BTreeMap<String, String>) {
    let mut email = None;
    let mut attributes = BTreeMap::new();

    let Some(resolution) = &event.resolution else {
        return (email, attributes);
    };

    for (key, value) in resolution {
        if key.eq_ignore_ascii_case(PERSONAL_EMAIL_FIELD) {
            if email.is_none() {
                email = primary_value(value);
            }
            continue;
        }
        let key = key.to_lowercase();
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if let Some(value) = primary_value(value) {
            attributes.entry(key).or_insert(value);
        }
    }

    (email, attributes)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an ISO-8601 timestamp; naive values are taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // %z takes both `+0000` and `+00:00`.
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%z",
        "%Y-%m-%d %H:%M%z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive_raw = raw.strip_suffix('Z').unwrap_or(raw);
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EventBatch;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(events: Vec<RawEvent>) -> EventPayload {
        EventPayload::Batches(vec![EventBatch { events }])
    }

    #[test]
    fn test_primary_value_extraction() {
        assert_eq!(
            primary_value(&json!("a@example.com, b@example.com")),
            Some("a@example.com".to_string())
        );
        assert_eq!(primary_value(&json!(" a@example.com ")), Some("a@example.com".to_string()));
        assert_eq!(
            primary_value(&json!(["x@example.com,y@example.com", "z@example.com"])),
            Some("x@example.com".to_string())
        );
        assert_eq!(primary_value(&json!("")), None);
        assert_eq!(primary_value(&json!(", b@example.com")), None);
        assert_eq!(primary_value(&json!([])), None);
        assert_eq!(primary_value(&json!(null)), None);
        assert_eq!(primary_value(&json!(42)), Some("42".to_string()));
    }

    #[test]
    fn test_drops_events_missing_identity_or_type() {
        let events = vec![
            RawEvent::new("abc", "copy"),
            RawEvent { event_type: Some("copy".to_string()), ..Default::default() },
            RawEvent::new("", "copy"),
            RawEvent { hem_sha256: Some("abc".to_string()), ..Default::default() },
            RawEvent::new("def", "  "),
        ];

        let (normalized, stats) = EventNormalizer::normalize_with_stats(&payload(events));

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].hem_sha256, "abc");
        assert_eq!(stats.total_events, 5);
        assert_eq!(stats.kept_events, 1);
        assert_eq!(stats.missing_identity, 2);
        assert_eq!(stats.missing_event_type, 2);
    }

    #[test]
    fn test_resolution_attributes_lowercased() {
        let event = RawEvent::new("abc", "copy")
            .with_timestamp("2024-01-15T08:30:00Z")
            .with_email("a@example.com,b@example.com")
            .with_resolution("COMPANY_NAME", json!("Acme, Acme Holdings"))
            .with_resolution("JOB_TITLES", json!(["CTO", "Founder"]))
            .with_resolution("EVENT_TYPE", json!("shadow"))
            .with_resolution("EMPTY", json!(""));

        let normalized = EventNormalizer::normalize(&payload(vec![event]));
        let event = &normalized[0];

        assert_eq!(event.personal_email.as_deref(), Some("a@example.com"));
        let mut expected = BTreeMap::new();
        expected.insert("company_name".to_string(), "Acme".to_string());
        expected.insert("job_titles".to_string(), "CTO".to_string());
        assert_eq!(event.attributes, expected);
        assert_eq!(
            event.event_timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_timestamp_gaps_are_counted_not_dropped() {
        let events = vec![
            RawEvent::new("abc", "copy"),
            RawEvent::new("abc", "copy").with_timestamp("yesterday"),
            RawEvent::new("abc", "copy").with_timestamp("2024-01-15T08:30:00Z"),
        ];

        let (normalized, stats) = EventNormalizer::normalize_with_stats(&payload(events));

        assert_eq!(normalized.len(), 3);
        assert_eq!(stats.missing_timestamp, 1);
        assert_eq!(stats.unparseable_timestamp, 1);
        assert_eq!(stats.scorable_events(), 1);
        assert!(!normalized[1].is_scorable());
        assert_eq!(normalized[1].raw_timestamp.as_deref(), Some("yesterday"));
        assert!(normalized[2].is_scorable());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2024-01-15T08:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T08:30:00+0000"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30:00.000+0200"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 08:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 10:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T08:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T08:30Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30+0200"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 08:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-15T08:30:00.250"),
            Some(expected + chrono::Duration::milliseconds(250))
        );
        assert_eq!(
            parse_timestamp("2024-01-15"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("15/01/2024"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_flattens_batches_in_order() {
        let payload = EventPayload::Batches(vec![
            EventBatch { events: vec![RawEvent::new("a", "copy")] },
            EventBatch { events: vec![] },
            EventBatch { events: vec![RawEvent::new("b", "page_view"), RawEvent::new("c", "copy")] },
        ]);

        let ids: Vec<String> = EventNormalizer::normalize(&payload)
            .into_iter()
            .map(|e| e.hem_sha256)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
