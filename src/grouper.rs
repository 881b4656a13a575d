//! Event grouping
//!
//! Partitions events by (identity hash, primary email) and collapses the event
//! types of each partition into a sorted, deduplicated label. A missing email is
//! its own partition key. Timestamps are not required.

use crate::types::{IdentityGroup, NormalizedEvent};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Separator used when joining event types
pub const EVENT_LABEL_SEPARATOR: &str = ", ";

type GroupKey<'e> = (&'e str, Option<&'e str>);

#[derive(Default)]
struct GroupAccumulator<'e> {
    event_types: BTreeSet<&'e str>,
    event_count: u32,
    first_event_timestamp: Option<&'e str>,
    attributes: BTreeMap<&'e str, &'e str>,
}

/// Grouper producing [`IdentityGroup`]s
pub struct EventGrouper;

impl EventGrouper {
    /// Group events in first-appearance order of their (identity, email) key
    pub fn group(events: &[NormalizedEvent]) -> Vec<IdentityGroup> {
        let mut keys: Vec<GroupKey<'_>> = Vec::new();
        let mut groups: HashMap<GroupKey<'_>, GroupAccumulator<'_>> = HashMap::new();

        for event in events {
            let key = (event.hem_sha256.as_str(), event.personal_email.as_deref());
            let acc = groups.entry(key).or_insert_with(|| {
                keys.push(key);
                GroupAccumulator::default()
            });

            acc.event_types.insert(&event.event_type);
            acc.event_count += 1;
            if acc.first_event_timestamp.is_none() {
                acc.first_event_timestamp = event.raw_timestamp.as_deref();
            }
            for (name, value) in &event.attributes {
                acc.attributes.entry(name.as_str()).or_insert(value.as_str());
            }
        }

        debug!(groups = keys.len(), events = events.len(), "grouped events");

        keys.into_iter()
            .filter_map(|key| groups.remove(&key).map(|acc| finish(key, acc)))
            .collect()
    }
}

fn finish((hem_sha256, email): GroupKey<'_>, acc: GroupAccumulator<'_>) -> IdentityGroup {
    let events_collected = acc
        .event_types
        .into_iter()
        .collect::<Vec<_>>()
        .join(EVENT_LABEL_SEPARATOR);

    IdentityGroup {
        hem_sha256: hem_sha256.to_string(),
        personal_emails: email.map(str::to_string),
        events_collected,
        event_count: acc.event_count,
        first_event_timestamp: acc.first_event_timestamp.map(str::to_string),
        attributes: acc
            .attributes
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}
