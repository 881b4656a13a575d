//! Per-identity score aggregation
//!
//! Groups scorable events by identity hash, sums their adjusted scores and adds
//! the temporal bonuses once per identity. Results are ordered by descending
//! final score; equal scores keep the order in which identities first appeared.

use crate::config::ScoringConfig;
use crate::scoring::ScoreCalculator;
use crate::temporal::TemporalBonusEngine;
use crate::types::{IdentityScore, NormalizedEvent};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Running totals for one identity
struct IdentityAccumulator<'e> {
    hem_sha256: &'e str,
    adjusted_total: f64,
    timestamps: Vec<DateTime<Utc>>,
    /// Email of the latest event that carried one; later input wins on equal times
    email: Option<(DateTime<Utc>, &'e str)>,
}

impl<'e> IdentityAccumulator<'e> {
    fn new(hem_sha256: &'e str) -> Self {
        Self {
            hem_sha256,
            adjusted_total: 0.0,
            timestamps: Vec::new(),
            email: None,
        }
    }

    fn observe_email(&mut self, at: DateTime<Utc>, email: &'e str) {
        match self.email {
            Some((seen_at, _)) if seen_at > at => {}
            _ => self.email = Some((at, email)),
        }
    }
}

/// Aggregator producing [`IdentityScore`]s
pub struct ScoreAggregator<'a> {
    calculator: ScoreCalculator<'a>,
    temporal: TemporalBonusEngine,
}

impl<'a> ScoreAggregator<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self {
            calculator: ScoreCalculator::new(config),
            temporal: TemporalBonusEngine::new(config),
        }
    }

    /// Score every identity that has at least one event with a parsed timestamp
    pub fn aggregate(&self, events: &[NormalizedEvent]) -> Vec<IdentityScore> {
        let Some(reference) = ScoreCalculator::reference_time(events) else {
            debug!("no scorable events in batch");
            return Vec::new();
        };

        let mut accumulators: Vec<IdentityAccumulator<'_>> = Vec::new();
        let mut index_by_identity: HashMap<&str, usize> = HashMap::new();

        for event in events {
            let Some(at) = event.event_timestamp else {
                continue;
            };
            let Some(adjusted) = self.calculator.adjusted_score(event, reference) else {
                continue;
            };

            let slot = *index_by_identity
                .entry(event.hem_sha256.as_str())
                .or_insert_with(|| {
                    accumulators.push(IdentityAccumulator::new(&event.hem_sha256));
                    accumulators.len() - 1
                });
            let acc = &mut accumulators[slot];

            acc.adjusted_total += adjusted;
            acc.timestamps.push(at);
            if let Some(email) = event.personal_email.as_deref() {
                acc.observe_email(at, email);
            }
        }

        let mut scores: Vec<IdentityScore> = accumulators
            .into_iter()
            .map(|acc| self.finish(acc))
            .collect();

        // Stable sort keeps first-appearance order among equal scores.
        scores.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));

        debug!(
            identities = scores.len(),
            reference = %reference,
            "aggregated identity scores"
        );

        scores
    }

    fn finish(&self, acc: IdentityAccumulator<'_>) -> IdentityScore {
        let event_count = acc.timestamps.len() as u32;
        let bonuses = self.temporal.evaluate(acc.timestamps);
        let final_score = sanitize(acc.adjusted_total + bonuses.total());

        IdentityScore {
            hem_sha256: acc.hem_sha256.to_string(),
            personal_emails: acc.email.map(|(_, email)| email.to_string()),
            final_score,
            adjusted_total: sanitize(acc.adjusted_total),
            burst_bonus: bonuses.burst,
            velocity_bonus: bonuses.velocity,
            event_count,
        }
    }
}

/// Clamp non-finite or negative values to 0
fn sanitize(score: f64) -> f64 {
    if score.is_finite() && score > 0.0 {
        score
    } else {
        0.0
    }
}
