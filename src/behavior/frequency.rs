//! Betting-frequency analysis over the trailing 30-day window.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::{BEHAVIOR_WINDOW_DAYS, RAPID_FIRE_GAP_SECS};
use crate::types::Position;

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyAnalysis {
    pub bets_last_24h: u32,
    pub daily_avg_7d: f64,
    pub daily_avg_30d: f64,
    /// Today's count exceeds twice the 30-day daily average.
    pub over_betting: bool,
    /// Consecutive bets placed under one hour apart.
    pub rapid_fire_pairs: u32,
}

/// `positions` must be the owner's trailing-window history sorted ascending
/// by placement time.
pub fn analyze(positions: &[Position], now: DateTime<Utc>) -> FrequencyAnalysis {
    let cutoff_24h = (now - Duration::hours(24)).timestamp();
    let cutoff_7d = (now - Duration::days(7)).timestamp();

    let bets_last_24h = positions.iter().filter(|p| p.placed_at >= cutoff_24h).count() as u32;
    let bets_7d = positions.iter().filter(|p| p.placed_at >= cutoff_7d).count();

    let daily_avg_7d = bets_7d as f64 / 7.0;
    let daily_avg_30d = positions.len() as f64 / BEHAVIOR_WINDOW_DAYS as f64;

    let over_betting = daily_avg_30d > 0.0 && f64::from(bets_last_24h) > 2.0 * daily_avg_30d;

    let rapid_fire_pairs = positions
        .windows(2)
        .filter(|w| w[1].placed_at - w[0].placed_at < RAPID_FIRE_GAP_SECS)
        .count() as u32;

    FrequencyAnalysis {
        bets_last_24h,
        daily_avg_7d,
        daily_avg_30d,
        over_betting,
        rapid_fire_pairs,
    }
}
