//! Pipeline orchestration
//!
//! Public entry points for the two pipelines:
//!
//! - scoring: payload → normalizer → score calculator + temporal bonuses → aggregator
//! - grouping: payload → normalizer → grouper
//!
//! Both are pure functions of their input and the injected configuration.

use crate::aggregator::ScoreAggregator;
use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::grouper::EventGrouper;
use crate::normalizer::{EventNormalizer, NormalizationStats};
use crate::schema::{EventPayload, PayloadAdapter};
use crate::types::{IdentityGroup, IdentityScore};
use serde::Serialize;
use std::collections::BTreeSet;

/// Score a payload with the default configuration (stateless, one-shot).
///
/// # Example
/// ```
/// use lead_score::PayloadAdapter;
///
/// let body = r#"{"events": [
///     {"hem_sha256": "abc", "event_type": "copy", "event_timestamp": "2024-01-15T08:30:00Z"}
/// ]}"#;
/// let payload = PayloadAdapter::parse(body)?;
/// let ranked = lead_score::score(&payload);
/// assert_eq!(ranked[0].hem_sha256, "abc");
/// # Ok::<(), lead_score::ScoringError>(())
/// ```
pub fn score(payload: &EventPayload) -> Vec<IdentityScore> {
    LeadScorer::new().score(payload)
}

/// Group a payload's events by identity and email (stateless, one-shot)
pub fn group(payload: &EventPayload) -> Vec<IdentityGroup> {
    LeadScorer::new().group(payload)
}

/// What a payload looks like to each pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Batches in the payload
    pub batches: usize,
    /// Normalization counts
    #[serde(flatten)]
    pub normalization: NormalizationStats,
    /// Events the scoring pipeline uses
    pub scorable_events: usize,
    /// Identities that would receive a score
    pub scored_identities: usize,
    /// (identity, email) groups the grouping pipeline emits
    pub groups: usize,
    /// Event types missing from the weight table; they score 0
    pub unknown_event_types: Vec<String>,
}

/// Scorer holding an immutable, validated configuration
#[derive(Debug, Clone, Default)]
pub struct LeadScorer {
    config: ScoringConfig,
}

impl LeadScorer {
    /// Create a scorer with the default weights and bonus parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with a custom configuration
    pub fn with_config(config: ScoringConfig) -> Result<Self, ScoringError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Rank identities by engagement score
    pub fn score(&self, payload: &EventPayload) -> Vec<IdentityScore> {
        let events = EventNormalizer::normalize(payload);
        ScoreAggregator::new(&self.config).aggregate(&events)
    }

    /// Summarize event types per (identity, email)
    pub fn group(&self, payload: &EventPayload) -> Vec<IdentityGroup> {
        let events = EventNormalizer::normalize(payload);
        EventGrouper::group(&events)
    }

    /// Decode a JSON body and score it
    pub fn score_json(&self, json: &str) -> Result<Vec<IdentityScore>, ScoringError> {
        let payload = PayloadAdapter::parse(json)?;
        Ok(self.score(&payload))
    }

    /// Decode a JSON body and group it
    pub fn group_json(&self, json: &str) -> Result<Vec<IdentityGroup>, ScoringError> {
        let payload = PayloadAdapter::parse(json)?;
        Ok(self.group(&payload))
    }

    /// Run both pipelines and report how the payload was consumed
    pub fn summarize(&self, payload: &EventPayload) -> BatchSummary {
        let (events, normalization) = EventNormalizer::normalize_with_stats(payload);
        let scored_identities = ScoreAggregator::new(&self.config).aggregate(&events).len();
        let groups = EventGrouper::group(&events).len();
        let unknown_event_types: BTreeSet<&str> = events
            .iter()
            .map(|e| e.event_type.as_str())
            .filter(|t| !self.config.weights.contains(t))
            .collect();

        BatchSummary {
            batches: payload.batches().len(),
            scorable_events: normalization.scorable_events(),
            normalization,
            scored_identities,
            groups,
            unknown_event_types: unknown_event_types.into_iter().map(String::from).collect(),
        }
    }
}
