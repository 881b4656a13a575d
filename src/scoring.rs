//! Per-event score calculation
//!
//! Each event gets a base weight from its type and a recency multiplier
//! relative to the most recent event in the whole filtered batch. The adjusted
//! score is their product.

use crate::config::ScoringConfig;
use crate::types::NormalizedEvent;
use chrono::{DateTime, Utc};

/// Score calculator bound to an immutable configuration
#[derive(Debug, Clone, Copy)]
pub struct ScoreCalculator<'a> {
    config: &'a ScoringConfig,
}

impl<'a> ScoreCalculator<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Base weight for an event type (0 for unknown types)
    pub fn base_weight(&self, event_type: &str) -> u32 {
        self.config.weights.weight(event_type)
    }

    /// Latest timestamp among scorable events, the recency reference point
    pub fn reference_time<'e, I>(events: I) -> Option<DateTime<Utc>>
    where
        I: IntoIterator<Item = &'e NormalizedEvent>,
    {
        events.into_iter().filter_map(|e| e.event_timestamp).max()
    }

    /// Recency multiplier for an event relative to the reference time
    ///
    /// Age is measured in whole days; events newer than the reference count as
    /// zero days old.
    pub fn recency_multiplier(&self, event_time: DateTime<Utc>, reference: DateTime<Utc>) -> f64 {
        let days_old = (reference - event_time).num_days().max(0);
        self.config
            .recency_tiers
            .iter()
            .find(|tier| days_old <= tier.max_days)
            .map(|tier| tier.multiplier)
            .unwrap_or(self.config.recency_floor)
    }

    /// Weight times recency multiplier; `None` for events without a timestamp
    pub fn adjusted_score(&self, event: &NormalizedEvent, reference: DateTime<Utc>) -> Option<f64> {
        let event_time = event.event_timestamp?;
        let weight = self.base_weight(&event.event_type) as f64;
        Some(weight * self.recency_multiplier(event_time, reference))
    }
}
