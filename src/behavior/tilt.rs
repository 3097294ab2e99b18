//! Tilt scoring: independently evaluated indicators summed into a composite.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::tilt as cfg;
use crate::types::{Position, PositionStatus};

#[derive(Debug, Clone, Serialize)]
pub struct TiltIndicator {
    pub name: &'static str,
    pub weight: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TiltAssessment {
    pub score: f64,
    pub is_tilting: bool,
    pub is_mild_tilt: bool,
    pub indicators: Vec<TiltIndicator>,
    pub recommendation: String,
}

/// Assess tilt from the trailing window.
///
/// `window` is the 30-day history sorted ascending by placement time;
/// `lifetime_sport_counts` covers the owner's entire history, for the
/// unfamiliar-market check. `local_offset_hours` shifts placement timestamps
/// into the user's local clock for the late-night window.
pub fn assess(
    window: &[Position],
    lifetime_sport_counts: &HashMap<String, usize>,
    bankroll: f64,
    local_offset_hours: i32,
) -> TiltAssessment {
    let mut indicators = Vec::new();

    let revenge = revenge_count(window);
    if revenge >= cfg::REVENGE_MIN_OCCURRENCES {
        indicators.push(TiltIndicator {
            name: "revenge_betting",
            weight: cfg::REVENGE_WEIGHT,
            detail: format!("{revenge} bets placed within 15 minutes of a loss"),
        });
    }

    let chases = loss_chase_count(window);
    if chases >= cfg::CHASE_MIN_OCCURRENCES {
        indicators.push(TiltIndicator {
            name: "loss_chasing",
            weight: cfg::CHASE_WEIGHT,
            detail: format!("{chases} stake increases of 50%+ immediately after a loss"),
        });
    }

    let unfamiliar = unfamiliar_recent_count(window, lifetime_sport_counts);
    if unfamiliar >= cfg::UNFAMILIAR_RECENT_MIN {
        indicators.push(TiltIndicator {
            name: "unfamiliar_markets",
            weight: cfg::UNFAMILIAR_WEIGHT,
            detail: format!("{unfamiliar} of the last 5 bets in rarely-played sports"),
        });
    }

    let late = late_night_count(window, local_offset_hours);
    if late >= cfg::LATE_NIGHT_MIN_BETS {
        indicators.push(TiltIndicator {
            name: "late_night_betting",
            weight: cfg::LATE_NIGHT_WEIGHT,
            detail: format!("{late} bets placed between 23:00 and 05:00"),
        });
    }

    if stake_inconsistency(window, bankroll) {
        indicators.push(TiltIndicator {
            name: "bet_size_inconsistency",
            weight: cfg::INCONSISTENCY_WEIGHT,
            detail: "stake sizing varies more than its own average".to_string(),
        });
    }

    let score: f64 = indicators.iter().map(|i| i.weight).sum();
    let is_tilting = score >= cfg::TILTING_THRESHOLD;
    let is_mild_tilt = !is_tilting && score >= cfg::MILD_TILT_THRESHOLD;

    let recommendation = if is_tilting {
        "Strong tilt indicators detected. Stop betting and take a break; new bets are blocked."
            .to_string()
    } else if is_mild_tilt {
        "Early tilt indicators detected. Slow down and stick to pre-planned stake sizes."
            .to_string()
    } else {
        "No significant tilt indicators. Keep following your plan.".to_string()
    };

    TiltAssessment {
        score,
        is_tilting,
        is_mild_tilt,
        indicators,
        recommendation,
    }
}

/// Bets placed within the revenge window after any loss settled.
fn revenge_count(window: &[Position]) -> usize {
    let losses: Vec<i64> = window
        .iter()
        .filter(|p| p.status == PositionStatus::Lost)
        .filter_map(|p| p.settled_at)
        .collect();
    window
        .iter()
        .filter(|p| {
            losses.iter().any(|&loss_at| {
                p.placed_at > loss_at && p.placed_at - loss_at <= cfg::REVENGE_WINDOW_SECS
            })
        })
        .count()
}

/// Stake raised by >= 50% on the bet immediately following a settled loss.
fn loss_chase_count(window: &[Position]) -> usize {
    window
        .windows(2)
        .filter(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            prev.status == PositionStatus::Lost
                && prev.settled_at.is_some_and(|t| t <= cur.placed_at)
                && cur.stake >= prev.stake * (1.0 + cfg::CHASE_STAKE_INCREASE)
        })
        .count()
}

fn unfamiliar_recent_count(
    window: &[Position],
    lifetime_sport_counts: &HashMap<String, usize>,
) -> usize {
    window
        .iter()
        .rev()
        .take(5)
        .filter(|p| {
            lifetime_sport_counts
                .get(&p.sport)
                .copied()
                .unwrap_or(0)
                <= cfg::UNFAMILIAR_LIFETIME_MAX
        })
        .count()
}

fn late_night_count(window: &[Position], local_offset_hours: i32) -> usize {
    window
        .iter()
        .filter(|p| {
            let local_secs = p.placed_at + i64::from(local_offset_hours) * 3600;
            let hour = (local_secs.rem_euclid(86_400) / 3600) as u32;
            hour >= cfg::LATE_NIGHT_START_HOUR || hour < cfg::LATE_NIGHT_END_HOUR
        })
        .count()
}

/// Standard deviation of stake-as-fraction-of-bankroll exceeding its mean.
fn stake_inconsistency(window: &[Position], bankroll: f64) -> bool {
    if window.len() < 2 || bankroll <= 0.0 {
        return false;
    }
    let fractions: Vec<f64> = window.iter().map(|p| p.stake / bankroll).collect();
    let mean = fractions.iter().sum::<f64>() / fractions.len() as f64;
    let variance =
        fractions.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / fractions.len() as f64;
    variance.sqrt() > mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketKind;

    fn bet(id: i64, placed_at: i64, stake: f64, status: PositionStatus) -> Position {
        let settled_at = status.is_settled().then_some(placed_at + 1800);
        Position {
            id,
            owner_id: "u1".to_string(),
            event_id: format!("evt{id}"),
            sport: "basketball".to_string(),
            team: None,
            market: MarketKind::Moneyline,
            outcome: "home".to_string(),
            stake,
            american_odds: -110,
            status,
            placed_at,
            settled_at,
            hedge_of: None,
        }
    }

    use PositionStatus::{Lost, Pending, Won};

    // Noon UTC so no bet accidentally lands in the late-night window.
    const T0: i64 = 1_699_963_200;

    fn familiar_counts() -> HashMap<String, usize> {
        HashMap::from([("basketball".to_string(), 40)])
    }

    #[test]
    fn revenge_and_chasing_score_sixty_five() {
        // Two losses, each followed within 15 minutes by a new bet with a
        // 50%+ stake increase: both indicators trigger, nothing else does.
        let window = vec![
            bet(1, T0, 50.0, Lost),               // settles T0+1800
            bet(2, T0 + 2000, 100.0, Lost),       // 200s after loss 1 settles; settles T0+3800
            bet(3, T0 + 4000, 200.0, Won),        // 200s after loss 2 settles
            bet(4, T0 + 90_000, 100.0, Won),
            bet(5, T0 + 180_000, 100.0, Won),
        ];
        let a = assess(&window, &familiar_counts(), 10_000.0, 0);
        assert_eq!(a.score, 65.0);
        assert!(a.is_tilting);
        assert!(!a.is_mild_tilt);
        let names: Vec<_> = a.indicators.iter().map(|i| i.name).collect();
        assert!(names.contains(&"revenge_betting"));
        assert!(names.contains(&"loss_chasing"));
    }

    #[test]
    fn single_occurrence_does_not_trigger() {
        let window = vec![
            bet(1, T0, 50.0, Lost),
            bet(2, T0 + 2000, 100.0, Won), // one revenge + one chase only
            bet(3, T0 + 90_000, 50.0, Won),
            bet(4, T0 + 180_000, 50.0, Won),
            bet(5, T0 + 270_000, 50.0, Won),
        ];
        let a = assess(&window, &familiar_counts(), 10_000.0, 0);
        assert_eq!(a.score, 0.0);
        assert!(!a.is_tilting && !a.is_mild_tilt);
    }

    #[test]
    fn tilting_and_mild_flags_are_exclusive() {
        // Late-night only → 15 points, neither flag.
        let midnight = T0 + 12 * 3600;
        let window = vec![
            bet(1, midnight, 50.0, Won),
            bet(2, midnight + 86_400, 50.0, Won),
            bet(3, midnight + 2 * 86_400, 50.0, Won),
        ];
        let a = assess(&window, &familiar_counts(), 10_000.0, 0);
        assert_eq!(a.score, 15.0);
        assert!(!a.is_tilting && !a.is_mild_tilt);

        // Late-night + unfamiliar markets → 35, mild only.
        let mut unfamiliar = window.clone();
        for p in &mut unfamiliar {
            p.sport = "cricket".to_string();
        }
        let a = assess(&unfamiliar, &familiar_counts(), 10_000.0, 0);
        assert_eq!(a.score, 35.0);
        assert!(a.is_mild_tilt && !a.is_tilting);
    }

    #[test]
    fn late_night_respects_local_offset() {
        // 03:00 UTC = 22:00 local at UTC-5 — not late night there.
        let three_am = T0 + 15 * 3600;
        let window: Vec<_> = (0..3)
            .map(|i| bet(i, three_am + i * 86_400, 50.0, Won))
            .collect();
        let utc = assess(&window, &familiar_counts(), 10_000.0, 0);
        assert!(utc.indicators.iter().any(|i| i.name == "late_night_betting"));
        let est = assess(&window, &familiar_counts(), 10_000.0, -5);
        assert!(!est.indicators.iter().any(|i| i.name == "late_night_betting"));
    }

    #[test]
    fn inconsistent_sizing_triggers() {
        let window = vec![
            bet(1, T0, 10.0, Won),
            bet(2, T0 + 86_400, 10.0, Won),
            bet(3, T0 + 2 * 86_400, 10.0, Won),
            bet(4, T0 + 3 * 86_400, 500.0, Pending),
        ];
        let a = assess(&window, &familiar_counts(), 1_000.0, 0);
        assert!(a
            .indicators
            .iter()
            .any(|i| i.name == "bet_size_inconsistency"));
    }

    #[test]
    fn score_is_never_negative() {
        let a = assess(&[], &HashMap::new(), 1_000.0, 0);
        assert!(a.score >= 0.0);
        assert!(!a.is_tilting && !a.is_mild_tilt);
    }
}
