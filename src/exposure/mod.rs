//! Aggregate exposure across an owner's open positions.

pub mod correlation;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::correlation as corr_cfg;
use crate::odds;
use crate::types::Position;

pub use correlation::{CorrelationEstimator, PairWarning, RuleBasedEstimator};

/// Point-in-time exposure for one owner. Recomputed idempotently from the
/// pending position set; one persisted row per (owner, date).
#[derive(Debug, Clone, Serialize)]
pub struct ExposureSummary {
    pub owner_id: String,
    pub snapshot_date: String,
    pub total_at_risk: f64,
    pub total_potential_payout: f64,
    pub open_positions: u32,
    pub by_sport: BTreeMap<String, f64>,
    pub by_market: BTreeMap<String, f64>,
    pub correlation_score: f64,
    pub high_correlation: bool,
}

/// Build the exposure summary and correlation warnings for an owner's
/// pending positions as of `now`.
pub fn compute(
    owner_id: &str,
    positions: &[Position],
    estimator: &dyn CorrelationEstimator,
    now: DateTime<Utc>,
) -> (ExposureSummary, Vec<PairWarning>) {
    let mut total_at_risk = 0.0;
    let mut total_potential_payout = 0.0;
    let mut by_sport: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_market: BTreeMap<String, f64> = BTreeMap::new();

    for p in positions {
        total_at_risk += p.stake;
        // Odds were validated at placement; a malformed row contributes
        // stake-only payout rather than poisoning the whole summary.
        let payout = odds::decimal_odds(p.american_odds)
            .map(|d| p.stake * d)
            .unwrap_or(p.stake);
        total_potential_payout += payout;
        *by_sport.entry(p.sport.clone()).or_insert(0.0) += p.stake;
        *by_market.entry(p.market.to_string()).or_insert(0.0) += p.stake;
    }

    let (correlation_score, warnings) = correlation::evaluate_pairs(estimator, positions);

    let summary = ExposureSummary {
        owner_id: owner_id.to_string(),
        snapshot_date: now.date_naive().to_string(),
        total_at_risk,
        total_potential_payout,
        open_positions: positions.len() as u32,
        by_sport,
        by_market,
        correlation_score,
        high_correlation: correlation_score > corr_cfg::PORTFOLIO_FLAG_THRESHOLD,
    };
    (summary, warnings)
}
