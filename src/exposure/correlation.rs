//! Pairwise correlation estimation between open positions.
//!
//! Deterministic rule table, not a statistical model. The trait is the seam
//! for swapping in a historical-covariance estimator later without touching
//! callers.

use serde::Serialize;

use crate::config::correlation as cfg;
use crate::types::{Position, Severity};

pub trait CorrelationEstimator: Send + Sync {
    /// Coefficient in [0, 1] for an unordered pair of positions.
    fn estimate(&self, a: &Position, b: &Position) -> f64;
}

/// Fixed-rule estimator: same event 0.9, shared team 0.7, same sport and
/// calendar day 0.3, baseline 0.1.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedEstimator;

impl CorrelationEstimator for RuleBasedEstimator {
    fn estimate(&self, a: &Position, b: &Position) -> f64 {
        if a.event_id == b.event_id {
            return cfg::SAME_EVENT;
        }
        if a.sport == b.sport {
            if let (Some(ta), Some(tb)) = (&a.team, &b.team) {
                if ta == tb {
                    return cfg::SHARED_TEAM;
                }
            }
            let same_day =
                a.placed_at_utc().date_naive() == b.placed_at_utc().date_naive();
            if same_day {
                return cfg::SAME_SPORT_SAME_DAY;
            }
        }
        cfg::BASELINE
    }
}

/// A correlated pair at or above the warning threshold. Persisted with the
/// lower position id first so repeated passes upsert instead of duplicating.
#[derive(Debug, Clone, Serialize)]
pub struct PairWarning {
    pub position_a: i64,
    pub position_b: i64,
    pub coefficient: f64,
    pub severity: Severity,
}

/// Evaluate all pairs of pending positions. Returns the portfolio mean
/// coefficient and every pair meeting the warning threshold. O(n²), fine for
/// per-user position counts in the tens.
pub fn evaluate_pairs(
    estimator: &dyn CorrelationEstimator,
    positions: &[Position],
) -> (f64, Vec<PairWarning>) {
    let mut sum = 0.0;
    let mut pairs = 0usize;
    let mut warnings = Vec::new();

    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let a = &positions[i];
            let b = &positions[j];
            let c = estimator.estimate(a, b);
            sum += c;
            pairs += 1;

            if c >= cfg::WARNING_THRESHOLD {
                let (lo, hi) = if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };
                warnings.push(PairWarning {
                    position_a: lo,
                    position_b: hi,
                    coefficient: c,
                    severity: Severity::from_coefficient(c),
                });
            }
        }
    }

    let score = if pairs == 0 { 0.0 } else { sum / pairs as f64 };
    (score, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketKind, PositionStatus};

    fn position(id: i64, event: &str, sport: &str, team: Option<&str>, placed_at: i64) -> Position {
        Position {
            id,
            owner_id: "u1".to_string(),
            event_id: event.to_string(),
            sport: sport.to_string(),
            team: team.map(str::to_string),
            market: MarketKind::Spread,
            outcome: "home".to_string(),
            stake: 50.0,
            american_odds: -110,
            status: PositionStatus::Pending,
            placed_at,
            settled_at: None,
            hedge_of: None,
        }
    }

    const DAY: i64 = 86_400;
    const T0: i64 = 1_700_000_000;

    #[test]
    fn same_event_is_always_high() {
        let est = RuleBasedEstimator;
        let a = position(1, "evt1", "basketball", Some("BOS"), T0);
        let b = position(2, "evt1", "football", None, T0 + 10 * DAY);
        assert_eq!(est.estimate(&a, &b), 0.9);
    }

    #[test]
    fn shared_team_same_sport() {
        let est = RuleBasedEstimator;
        let a = position(1, "evt1", "basketball", Some("BOS"), T0);
        let b = position(2, "evt2", "basketball", Some("BOS"), T0 + 3 * DAY);
        assert_eq!(est.estimate(&a, &b), 0.7);
    }

    #[test]
    fn same_sport_same_day_without_team() {
        let est = RuleBasedEstimator;
        let a = position(1, "evt1", "basketball", Some("BOS"), T0);
        let b = position(2, "evt2", "basketball", Some("LAL"), T0 + 3600);
        assert_eq!(est.estimate(&a, &b), 0.3);
    }

    #[test]
    fn unrelated_positions_get_baseline() {
        let est = RuleBasedEstimator;
        let a = position(1, "evt1", "basketball", Some("BOS"), T0);
        let b = position(2, "evt2", "hockey", Some("NYR"), T0 + 5 * DAY);
        assert_eq!(est.estimate(&a, &b), 0.1);
    }

    #[test]
    fn same_event_pair_yields_one_high_warning() {
        let positions = vec![
            position(1, "evt1", "basketball", Some("BOS"), T0),
            position(2, "evt1", "basketball", Some("LAL"), T0),
        ];
        let (score, warnings) = evaluate_pairs(&RuleBasedEstimator, &positions);
        assert_eq!(score, 0.9);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].coefficient, 0.9);
        assert_eq!(warnings[0].severity, Severity::High);
        assert_eq!((warnings[0].position_a, warnings[0].position_b), (1, 2));
    }

    #[test]
    fn warning_pair_is_ordered_regardless_of_input_order() {
        let positions = vec![
            position(7, "evt1", "basketball", None, T0),
            position(3, "evt1", "basketball", None, T0),
        ];
        let (_, warnings) = evaluate_pairs(&RuleBasedEstimator, &positions);
        assert_eq!((warnings[0].position_a, warnings[0].position_b), (3, 7));
    }

    #[test]
    fn empty_and_single_position_score_zero() {
        let (score, warnings) = evaluate_pairs(&RuleBasedEstimator, &[]);
        assert_eq!(score, 0.0);
        assert!(warnings.is_empty());

        let one = vec![position(1, "evt1", "basketball", None, T0)];
        let (score, warnings) = evaluate_pairs(&RuleBasedEstimator, &one);
        assert_eq!(score, 0.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn sub_threshold_pairs_produce_no_warning() {
        let positions = vec![
            position(1, "evt1", "basketball", Some("BOS"), T0),
            position(2, "evt2", "hockey", Some("NYR"), T0 + 5 * DAY),
        ];
        let (score, warnings) = evaluate_pairs(&RuleBasedEstimator, &positions);
        assert_eq!(score, 0.1);
        assert!(warnings.is_empty());
    }
}
