//! Temporal bonus heuristics
//!
//! Two independent bonuses computed once per identity from its event
//! timestamps:
//!
//! - **Burst**: a flat bonus when at least `min_events` events fall inside one
//!   forward window of `window_secs`, i.e. some event `t_i` has enough events
//!   `t_j` with `0 <= t_j - t_i <= window`. Over sorted timestamps this is a
//!   single linear pass comparing `t[i + n - 1] - t[i]` to the window.
//! - **Velocity**: event count divided by the minutes between the earliest and
//!   latest event, mapped through rate tiers. A zero-length span scores 0.

use crate::config::{BurstConfig, ScoringConfig, VelocityTier};
use chrono::{DateTime, Duration, Utc};

/// Bonuses awarded to one identity
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemporalBonuses {
    pub burst: f64,
    pub velocity: f64,
}

impl TemporalBonuses {
    pub fn total(&self) -> f64 {
        self.burst + self.velocity
    }
}

/// Engine computing burst and velocity bonuses
#[derive(Debug, Clone)]
pub struct TemporalBonusEngine {
    burst: BurstConfig,
    /// Ordered by descending `min_rate`
    velocity_tiers: Vec<VelocityTier>,
}

impl TemporalBonusEngine {
    pub fn new(config: &ScoringConfig) -> Self {
        let mut velocity_tiers = config.velocity_tiers.clone();
        velocity_tiers.sort_by(|a, b| b.min_rate.total_cmp(&a.min_rate));
        Self {
            burst: config.burst,
            velocity_tiers,
        }
    }

    /// Compute both bonuses for one identity's timestamps (any order)
    pub fn evaluate(&self, mut timestamps: Vec<DateTime<Utc>>) -> TemporalBonuses {
        timestamps.sort_unstable();
        TemporalBonuses {
            burst: self.burst_bonus(&timestamps),
            velocity: self.velocity_bonus(&timestamps),
        }
    }

    /// Burst bonus over sorted timestamps; either 0 or the configured bonus
    pub fn burst_bonus(&self, sorted: &[DateTime<Utc>]) -> f64 {
        let needed = self.burst.min_events;
        if needed == 0 || sorted.len() < needed {
            return 0.0;
        }

        // A window beyond chrono's range holds any run of timestamps.
        let found = match Duration::try_seconds(self.burst.window_secs) {
            Some(window) => sorted
                .windows(needed)
                .any(|run| run[needed - 1] - run[0] <= window),
            None => self.burst.window_secs > 0,
        };

        if found {
            self.burst.bonus
        } else {
            0.0
        }
    }

    /// Velocity bonus over sorted timestamps
    pub fn velocity_bonus(&self, sorted: &[DateTime<Utc>]) -> f64 {
        let Some(rate) = event_rate(sorted) else {
            return 0.0;
        };

        self.velocity_tiers
            .iter()
            .find(|tier| rate >= tier.min_rate)
            .map(|tier| tier.bonus)
            .unwrap_or(0.0)
    }
}

/// Events per minute over the span of sorted timestamps, `None` for a zero span
pub fn event_rate(sorted: &[DateTime<Utc>]) -> Option<f64> {
    let (first, last) = (sorted.first()?, sorted.last()?);
    let duration_min = (*last - *first).num_milliseconds() as f64 / 60_000.0;
    if duration_min > 0.0 {
        Some(sorted.len() as f64 / duration_min)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn at(offsets_sec: &[i64]) -> Vec<DateTime<Utc>> {
        offsets_sec.iter().map(|s| t0() + Duration::seconds(*s)).collect()
    }

    fn engine() -> TemporalBonusEngine {
        TemporalBonusEngine::new(&ScoringConfig::default())
    }

    #[test]
    fn test_burst_three_events_within_window() {
        assert_eq!(engine().burst_bonus(&at(&[0, 5, 500])), 5.0);
        assert_eq!(engine().burst_bonus(&at(&[0, 300, 600])), 5.0);
    }

    #[test]
    fn test_burst_with_oversized_window() {
        let mut config = ScoringConfig::default();
        config.burst.window_secs = i64::MAX;
        let engine = TemporalBonusEngine::new(&config);

        assert_eq!(engine.burst_bonus(&at(&[0, 60, 120])), 5.0);
        assert_eq!(engine.burst_bonus(&at(&[0, 60])), 0.0);
    }

    #[test]
    fn test_burst_window_is_forward_only() {
        // Each neighbour is 600s away, but no forward window holds three events.
        assert_eq!(engine().burst_bonus(&at(&[0, 600, 1200])), 0.0);
        assert_eq!(engine().burst_bonus(&at(&[0, 400, 801])), 0.0);
    }

    #[test]
    fn test_burst_needs_three_events() {
        assert_eq!(engine().burst_bonus(&at(&[])), 0.0);
        assert_eq!(engine().burst_bonus(&at(&[0])), 0.0);
        assert_eq!(engine().burst_bonus(&at(&[0, 1])), 0.0);
        assert_eq!(engine().burst_bonus(&at(&[0, 0, 0])), 5.0);
    }

    #[test]
    fn test_burst_found_later_in_sequence() {
        assert_eq!(engine().burst_bonus(&at(&[0, 3600, 7200, 7210, 7220])), 5.0);
    }

    #[test]
    fn test_burst_is_binary() {
        let engine = engine();
        for n in 0..20 {
            let offsets: Vec<i64> = (0..n).map(|i| i * 37).collect();
            let bonus = engine.burst_bonus(&at(&offsets));
            assert!(bonus == 0.0 || bonus == 5.0);
        }
    }

    #[test]
    fn test_velocity_zero_duration() {
        assert_eq!(engine().velocity_bonus(&at(&[0])), 0.0);
        assert_eq!(engine().velocity_bonus(&at(&[0, 0, 0, 0])), 0.0);
        assert_eq!(engine().velocity_bonus(&at(&[])), 0.0);
    }

    #[test]
    fn test_velocity_tiers() {
        // 3 events over 60s = 3/min
        assert_eq!(engine().velocity_bonus(&at(&[0, 30, 60])), 3.0);
        // 2 events over 60s = 2/min
        assert_eq!(engine().velocity_bonus(&at(&[0, 60])), 3.0);
        // 2 events over 120s = 1/min
        assert_eq!(engine().velocity_bonus(&at(&[0, 120])), 2.0);
        // 2 events over 240s = 0.5/min
        assert_eq!(engine().velocity_bonus(&at(&[0, 240])), 1.0);
        // 3 events over 500s = 0.36/min
        assert_eq!(engine().velocity_bonus(&at(&[0, 5, 500])), 0.0);
    }

    #[test]
    fn test_evaluate_sorts_input() {
        let bonuses = engine().evaluate(at(&[500, 0, 5]));
        assert_eq!(bonuses, TemporalBonuses { burst: 5.0, velocity: 0.0 });
        assert_eq!(bonuses.total(), 5.0);
    }

    #[test]
    fn test_custom_tiers_are_ordered() {
        let mut config = ScoringConfig::default();
        config.velocity_tiers = vec![
            VelocityTier { min_rate: 0.1, bonus: 0.5 },
            VelocityTier { min_rate: 10.0, bonus: 9.0 },
        ];
        let engine = TemporalBonusEngine::new(&config);
        assert_eq!(engine.velocity_bonus(&at(&[0, 60])), 0.5);
        assert_eq!(engine.velocity_bonus(&at(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10])), 9.0);
    }

    #[test]
    fn test_event_rate() {
        let rate = event_rate(&at(&[0, 5, 500])).unwrap();
        assert!((rate - 0.36).abs() < 1e-9);
        assert_eq!(event_rate(&at(&[0])), None);
    }
}
