//! Behavioral analysis: frequency, streaks, tilt, and bet sizing composed
//! into a single advisory bundle.

pub mod frequency;
pub mod streaks;
pub mod tilt;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::tilt as tilt_cfg;
use crate::types::{AdvisoryBand, Position};

pub use frequency::FrequencyAnalysis;
pub use streaks::StreakAnalysis;
pub use tilt::TiltAssessment;

/// Minimum settled bets before the analyzer produces a report.
pub const MIN_SETTLED_BETS: usize = tilt_cfg::MIN_SETTLED_BETS;

// Advisory-score deductions per triggered category.
const DEDUCT_TILTING: f64 = 40.0;
const DEDUCT_MILD_TILT: f64 = 20.0;
const DEDUCT_OVER_BETTING: f64 = 15.0;
const DEDUCT_RAPID_FIRE: f64 = 10.0;
const DEDUCT_COLD_STREAK: f64 = 10.0;
const DEDUCT_OVERSIZED: f64 = 15.0;

/// Rapid-fire pairs at or above this count cost advisory points.
const RAPID_FIRE_DEDUCT_MIN: u32 = 3;
/// Average stake more than this multiple of the average recommendation is
/// flagged as oversizing.
const OVERSIZE_RATIO: f64 = 1.5;

#[derive(Debug, Clone, Serialize)]
pub struct SizingAnalysis {
    /// Mean actual stake over the window.
    pub avg_stake: f64,
    /// Mean recommended stake from stored sizer output, when present.
    pub avg_recommended: Option<f64>,
    /// avg_stake / avg_recommended − 1, as a percentage.
    pub kelly_deviation_pct: Option<f64>,
    pub oversized: bool,
}

/// Compare actual stakes against stored sizer recommendations. Both sets
/// cover the same trailing window; recommendations are optional because the
/// sizer may never have been consulted.
pub fn analyze_sizing(window: &[Position], recommended_stakes: &[f64]) -> SizingAnalysis {
    let avg_stake = if window.is_empty() {
        0.0
    } else {
        window.iter().map(|p| p.stake).sum::<f64>() / window.len() as f64
    };

    let positive: Vec<f64> = recommended_stakes.iter().copied().filter(|s| *s > 0.0).collect();
    if positive.is_empty() {
        return SizingAnalysis {
            avg_stake,
            avg_recommended: None,
            kelly_deviation_pct: None,
            oversized: false,
        };
    }
    let avg_recommended = positive.iter().sum::<f64>() / positive.len() as f64;
    let ratio = avg_stake / avg_recommended;
    SizingAnalysis {
        avg_stake,
        avg_recommended: Some(avg_recommended),
        kelly_deviation_pct: Some((ratio - 1.0) * 100.0),
        oversized: ratio > OVERSIZE_RATIO,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// 1 is most urgent.
    pub priority: u8,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BehaviorReport {
    /// Not an error: history is too thin to say anything.
    InsufficientData {
        settled_bets: usize,
        required: usize,
    },
    Ok(Box<AdvisoryBundle>),
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryBundle {
    /// 0–100, higher is healthier.
    pub overall_score: f64,
    pub band: AdvisoryBand,
    pub frequency: FrequencyAnalysis,
    pub streaks: StreakAnalysis,
    pub tilt: TiltAssessment,
    pub sizing: SizingAnalysis,
    pub recommendations: Vec<Recommendation>,
}

/// Full behavioral report for one owner.
///
/// `window` is the trailing 30-day history sorted ascending by placement
/// time; `lifetime_sport_counts` spans the owner's whole history.
pub fn analyze(
    window: &[Position],
    lifetime_sport_counts: &HashMap<String, usize>,
    recommended_stakes: &[f64],
    bankroll: f64,
    local_offset_hours: i32,
    now: DateTime<Utc>,
) -> BehaviorReport {
    let settled = window.iter().filter(|p| p.status.is_settled()).count();
    if settled < MIN_SETTLED_BETS {
        return BehaviorReport::InsufficientData {
            settled_bets: settled,
            required: MIN_SETTLED_BETS,
        };
    }

    let frequency = frequency::analyze(window, now);
    let streaks = streaks::analyze(window);
    let tilt = tilt::assess(window, lifetime_sport_counts, bankroll, local_offset_hours);
    let sizing = analyze_sizing(window, recommended_stakes);

    let mut score = 100.0;
    let mut recommendations = Vec::new();

    if tilt.is_tilting {
        score -= DEDUCT_TILTING;
        recommendations.push(Recommendation {
            priority: 1,
            message: tilt.recommendation.clone(),
        });
    } else if tilt.is_mild_tilt {
        score -= DEDUCT_MILD_TILT;
        recommendations.push(Recommendation {
            priority: 2,
            message: tilt.recommendation.clone(),
        });
    }

    if frequency.over_betting {
        score -= DEDUCT_OVER_BETTING;
        recommendations.push(Recommendation {
            priority: 2,
            message: format!(
                "{} bets in the last 24 hours is more than double your 30-day average of {:.1}/day.",
                frequency.bets_last_24h, frequency.daily_avg_30d
            ),
        });
    }

    if frequency.rapid_fire_pairs >= RAPID_FIRE_DEDUCT_MIN {
        score -= DEDUCT_RAPID_FIRE;
        recommendations.push(Recommendation {
            priority: 3,
            message: format!(
                "{} bets were placed under an hour after the previous one. Space your bets out.",
                frequency.rapid_fire_pairs
            ),
        });
    }

    if streaks.cold {
        score -= DEDUCT_COLD_STREAK;
        recommendations.push(Recommendation {
            priority: 2,
            message: format!(
                "You are on a {}-bet losing streak. Consider smaller stakes until results turn.",
                streaks.current_length
            ),
        });
    } else if streaks.hot {
        recommendations.push(Recommendation {
            priority: 4,
            message: format!(
                "{}-bet winning streak. Do not let it inflate your stake sizes.",
                streaks.current_length
            ),
        });
    }

    if sizing.oversized {
        score -= DEDUCT_OVERSIZED;
        if let Some(dev) = sizing.kelly_deviation_pct {
            recommendations.push(Recommendation {
                priority: 2,
                message: format!(
                    "Average stake runs {dev:.0}% above the recommended Kelly sizing."
                ),
            });
        }
    }

    recommendations.sort_by_key(|r| r.priority);
    let overall_score = score.max(0.0);

    BehaviorReport::Ok(Box::new(AdvisoryBundle {
        overall_score,
        band: AdvisoryBand::from_score(overall_score),
        frequency,
        streaks,
        tilt,
        sizing,
        recommendations,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketKind, PositionStatus};
    use chrono::TimeZone;

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

    use PositionStatus::{Lost, Won};

    const T0: i64 = 1_699_963_200; // noon UTC
    const DAY: i64 = 86_400;

    fn counts() -> HashMap<String, usize> {
        HashMap::from([("basketball".to_string(), 40)])
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(T0 + 29 * DAY, 0).single().unwrap()
    }

    #[test]
    fn thin_history_is_insufficient_data() {
        let window = vec![bet(1, T0, 50.0, Won), bet(2, T0 + DAY, 50.0, Lost)];
        match analyze(&window, &counts(), &[], 1000.0, 0, now()) {
            BehaviorReport::InsufficientData {
                settled_bets,
                required,
            } => {
                assert_eq!(settled_bets, 2);
                assert_eq!(required, 5);
            }
            BehaviorReport::Ok(_) => panic!("expected insufficient data"),
        }
    }

    #[test]
    fn healthy_history_scores_excellent() {
        let window: Vec<_> = (0..6)
            .map(|i| bet(i, T0 + i * 3 * DAY, 50.0, if i % 2 == 0 { Won } else { Lost }))
            .collect();
        match analyze(&window, &counts(), &[50.0], 5_000.0, 0, now()) {
            BehaviorReport::Ok(b) => {
                assert_eq!(b.overall_score, 100.0);
                assert_eq!(b.band, AdvisoryBand::Excellent);
            }
            BehaviorReport::InsufficientData { .. } => panic!("expected report"),
        }
    }

    #[test]
    fn cold_streak_deducts_and_recommends() {
        let window: Vec<_> = (0..6)
            .map(|i| bet(i, T0 + i * 3 * DAY, 50.0, if i < 2 { Won } else { Lost }))
            .collect();
        match analyze(&window, &counts(), &[], 5_000.0, 0, now()) {
            BehaviorReport::Ok(b) => {
                assert!(b.streaks.cold);
                assert_eq!(b.overall_score, 90.0);
                assert!(b
                    .recommendations
                    .iter()
                    .any(|r| r.message.contains("losing streak")));
            }
            BehaviorReport::InsufficientData { .. } => panic!("expected report"),
        }
    }

    #[test]
    fn recommendations_sorted_by_priority() {
        // Cold streak (priority 2) + oversizing (priority 2) + rapid fire
        // (priority 3): listing order must be non-decreasing priority.
        let mut window: Vec<_> = (0..6)
            .map(|i| bet(i, T0 + i * 600, 300.0, Lost))
            .collect();
        window.push(bet(7, T0 + 3600 * 50, 300.0, Lost));
        match analyze(&window, &counts(), &[50.0], 5_000.0, 0, now()) {
            BehaviorReport::Ok(b) => {
                assert!(b.recommendations.len() >= 2);
                for pair in b.recommendations.windows(2) {
                    assert!(pair[0].priority <= pair[1].priority);
                }
            }
            BehaviorReport::InsufficientData { .. } => panic!("expected report"),
        }
    }

    #[test]
    fn sizing_comparison() {
        let window = vec![bet(1, T0, 100.0, Won), bet(2, T0 + DAY, 100.0, Won)];
        let s = analyze_sizing(&window, &[50.0, 50.0]);
        assert_eq!(s.avg_stake, 100.0);
        assert_eq!(s.avg_recommended, Some(50.0));
        assert_eq!(s.kelly_deviation_pct, Some(100.0));
        assert!(s.oversized);

        let none = analyze_sizing(&window, &[]);
        assert!(none.avg_recommended.is_none());
        assert!(!none.oversized);
    }
}
