//! Scoring configuration
//!
//! Holds the event weight table and the recency, burst and velocity parameters.
//! A [`ScoringConfig`] is an immutable value injected into
//! [`LeadScorer`](crate::pipeline::LeadScorer); nothing here is process-global.
//!
//! Every field falls back to its default when omitted from JSON, so a config
//! file only needs to name what it overrides. A `weights` table in a file
//! replaces the default table entirely.

use crate::error::ScoringError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default burst window in seconds
pub const DEFAULT_BURST_WINDOW_SECS: i64 = 600;

/// Default number of events that must fall inside one burst window
pub const DEFAULT_BURST_MIN_EVENTS: usize = 3;

/// Default flat burst bonus
pub const DEFAULT_BURST_BONUS: f64 = 5.0;

/// Recency multiplier for events older than every tier
pub const DEFAULT_RECENCY_FLOOR: f64 = 0.2;

/// Base weights per event type
const DEFAULT_EVENT_WEIGHTS: [(&str, u32); 10] = [
    ("all_form_submissions", 10),
    ("file_downloads", 9),
    ("copy", 8),
    ("deep_scroll", 6),
    ("all_clicks", 4),
    ("video_play", 3),
    ("exit_intent", 3),
    ("video_pause", 2),
    ("user_idle", 2),
    ("page_view", 1),
];

/// Event-type weight lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventWeights(BTreeMap<String, u32>);

impl Default for EventWeights {
    fn default() -> Self {
        DEFAULT_EVENT_WEIGHTS
            .iter()
            .map(|(name, weight)| (name.to_string(), *weight))
            .collect()
    }
}

impl FromIterator<(String, u32)> for EventWeights {
    fn from_iter<T: IntoIterator<Item = (String, u32)>>(iter: T) -> Self {
        EventWeights(iter.into_iter().collect())
    }
}

impl EventWeights {
    /// Weight for an event type; unknown types weigh 0
    pub fn weight(&self, event_type: &str) -> u32 {
        self.0.get(event_type).copied().unwrap_or(0)
    }

    /// Whether the event type has an entry in the table
    pub fn contains(&self, event_type: &str) -> bool {
        self.0.contains_key(event_type)
    }

    /// Entries ordered by descending weight, then name
    pub fn ranked(&self) -> Vec<(&str, u32)> {
        let mut entries: Vec<(&str, u32)> = self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Events at most `max_days` old receive `multiplier`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyTier {
    pub max_days: i64,
    pub multiplier: f64,
}

/// Identities whose event rate is at least `min_rate` per minute receive `bonus`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityTier {
    pub min_rate: f64,
    pub bonus: f64,
}

/// Burst detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    /// Window length in seconds (inclusive)
    pub window_secs: i64,
    /// Events needed inside one window, the anchor event included
    pub min_events: usize,
    /// Flat bonus awarded when a burst is found
    pub bonus: f64,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_BURST_WINDOW_SECS,
            min_events: DEFAULT_BURST_MIN_EVENTS,
            bonus: DEFAULT_BURST_BONUS,
        }
    }
}

/// Complete scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Base weight per event type
    pub weights: EventWeights,
    /// Recency tiers ordered by ascending `max_days`
    pub recency_tiers: Vec<RecencyTier>,
    /// Multiplier for events older than the last tier
    pub recency_floor: f64,
    /// Burst bonus parameters
    pub burst: BurstConfig,
    /// Velocity tiers, evaluated from the highest `min_rate` down
    pub velocity_tiers: Vec<VelocityTier>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: EventWeights::default(),
            recency_tiers: vec![
                RecencyTier { max_days: 1, multiplier: 1.2 },
                RecencyTier { max_days: 3, multiplier: 1.0 },
                RecencyTier { max_days: 7, multiplier: 0.7 },
                RecencyTier { max_days: 14, multiplier: 0.5 },
            ],
            recency_floor: DEFAULT_RECENCY_FLOOR,
            burst: BurstConfig::default(),
            velocity_tiers: vec![
                VelocityTier { min_rate: 2.0, bonus: 3.0 },
                VelocityTier { min_rate: 1.0, bonus: 2.0 },
                VelocityTier { min_rate: 0.5, bonus: 1.0 },
            ],
        }
    }
}

impl ScoringConfig {
    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let config: ScoringConfig = serde_json::from_str(json)
            .map_err(|e| ScoringError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ScoringError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would break the non-negative, finite score guarantee
    pub fn validate(&self) -> Result<(), ScoringError> {
        let mut previous_days = i64::MIN;
        for tier in &self.recency_tiers {
            if tier.max_days <= previous_days {
                return Err(ScoringError::InvalidConfig(
                    "recency_tiers must be ordered by strictly ascending max_days".to_string(),
                ));
            }
            check_non_negative("recency multiplier", tier.multiplier)?;
            previous_days = tier.max_days;
        }
        check_non_negative("recency_floor", self.recency_floor)?;

        if self.burst.window_secs <= 0 {
            return Err(ScoringError::InvalidConfig(format!(
                "burst.window_secs must be positive, got {}",
                self.burst.window_secs
            )));
        }
        if chrono::Duration::try_seconds(self.burst.window_secs).is_none() {
            return Err(ScoringError::InvalidConfig(format!(
                "burst.window_secs is out of range, got {}",
                self.burst.window_secs
            )));
        }
        if self.burst.min_events == 0 {
            return Err(ScoringError::InvalidConfig(
                "burst.min_events must be at least 1".to_string(),
            ));
        }
        check_non_negative("burst.bonus", self.burst.bonus)?;

        for tier in &self.velocity_tiers {
            check_non_negative("velocity min_rate", tier.min_rate)?;
            check_non_negative("velocity bonus", tier.bonus)?;
        }

        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), ScoringError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ScoringError::InvalidConfig(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_weights() {
        let weights = EventWeights::default();
        assert_eq!(weights.len(), 10);
        assert_eq!(weights.weight("all_form_submissions"), 10);
        assert_eq!(weights.weight("file_downloads"), 9);
        assert_eq!(weights.weight("copy"), 8);
        assert_eq!(weights.weight("deep_scroll"), 6);
        assert_eq!(weights.weight("all_clicks"), 4);
        assert_eq!(weights.weight("video_play"), 3);
        assert_eq!(weights.weight("exit_intent"), 3);
        assert_eq!(weights.weight("video_pause"), 2);
        assert_eq!(weights.weight("user_idle"), 2);
        assert_eq!(weights.weight("page_view"), 1);
    }

    #[test]
    fn test_unknown_event_type_weighs_zero() {
        let weights = EventWeights::default();
        assert_eq!(weights.weight("foo_bar"), 0);
        assert!(!weights.contains("foo_bar"));
    }

    #[test]
    fn test_ranked_order() {
        let weights = EventWeights::default();
        let ranked = weights.ranked();
        assert_eq!(ranked[0], ("all_form_submissions", 10));
        assert_eq!(ranked[5], ("exit_intent", 3));
        assert_eq!(ranked[6], ("video_play", 3));
        assert_eq!(ranked[9], ("page_view", 1));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ScoringConfig::from_json(r#"{"burst": {"bonus": 7.5}}"#).unwrap();
        assert_eq!(config.burst.bonus, 7.5);
        assert_eq!(config.burst.window_secs, DEFAULT_BURST_WINDOW_SECS);
        assert_eq!(config.weights, EventWeights::default());
        assert_eq!(config.recency_tiers.len(), 4);
    }

    #[test]
    fn test_json_roundtrip_of_defaults() {
        let config = ScoringConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(ScoringConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_weights_override_replaces_table() {
        let config = ScoringConfig::from_json(r#"{"weights": {"demo_request": 12}}"#).unwrap();
        assert_eq!(config.weights.weight("demo_request"), 12);
        assert_eq!(config.weights.weight("copy"), 0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ScoringConfig::from_json(r#"{"burst": {"min_events": 0}}"#).is_err());
        assert!(ScoringConfig::from_json(r#"{"burst": {"window_secs": 0}}"#).is_err());
        assert!(
            ScoringConfig::from_json(r#"{"burst": {"window_secs": 9223372036854775807}}"#).is_err()
        );
        assert!(ScoringConfig::from_json(r#"{"recency_floor": -1.0}"#).is_err());
        assert!(ScoringConfig::from_json(
            r#"{"recency_tiers": [{"max_days": 3, "multiplier": 1.0}, {"max_days": 1, "multiplier": 1.2}]}"#
        )
        .is_err());
        assert!(ScoringConfig::from_json(r#"{"weights": {"copy": -2}}"#).is_err());
    }
}
