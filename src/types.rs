//! Core data types for lead scoring
//!
//! Normalized events flow from the normalizer into the two pipelines; the
//! scoring pipeline emits [`IdentityScore`] and the grouping pipeline emits
//! [`IdentityGroup`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A flattened event with identity and type guaranteed present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Hashed identity
    pub hem_sha256: String,
    /// Interaction type
    pub event_type: String,
    /// Parsed timestamp, `None` when missing or unparseable
    pub event_timestamp: Option<DateTime<Utc>>,
    /// Timestamp exactly as received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_timestamp: Option<String>,
    /// Primary personal email
    pub personal_email: Option<String>,
    /// Other resolution attributes, lower-cased keys, first value only
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl NormalizedEvent {
    /// Whether this event carries everything the scoring pipeline needs
    pub fn is_scorable(&self) -> bool {
        self.event_timestamp.is_some()
    }
}

/// Engagement score for a single identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityScore {
    /// Hashed identity
    pub hem_sha256: String,
    /// Primary email attached to the identity, `null` when none was seen
    pub personal_emails: Option<String>,
    /// Sum of adjusted scores plus temporal bonuses
    pub final_score: f64,
    /// Sum of per-event adjusted scores
    pub adjusted_total: f64,
    /// Burst bonus (0 or the configured flat bonus)
    pub burst_bonus: f64,
    /// Velocity bonus
    pub velocity_bonus: f64,
    /// Number of scored events
    pub event_count: u32,
}

/// Deduplicated event summary for one (identity, email) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityGroup {
    /// Hashed identity
    pub hem_sha256: String,
    /// Primary email, `null` forms its own group
    pub personal_emails: Option<String>,
    /// Sorted, deduplicated, comma-space-joined event types
    pub events_collected: String,
    /// Number of events in the partition (before deduplication)
    pub event_count: u32,
    /// First non-null timestamp string seen in the partition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_event_timestamp: Option<String>,
    /// First-seen value of every other resolution attribute
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}
