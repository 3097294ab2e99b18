//! Arbitrage stake splitting and hedge sizing across opposing outcomes.

use serde::{Deserialize, Serialize};

use crate::config::HEDGE_RECOMMEND_PROFIT_PCT;
use crate::error::{AppError, Result};
use crate::odds;
use crate::types::{Position, PositionStatus};

// ---------------------------------------------------------------------------
// Arbitrage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageResult {
    pub has_arbitrage: bool,
    /// Sum of implied probabilities; below 1.0 means the book is beatable.
    pub arb_percentage: f64,
    pub stake_a: f64,
    pub stake_b: f64,
    pub payout: f64,
    pub guaranteed_profit: f64,
    /// Profit as a fraction of total stake.
    pub roi_pct: f64,
}

/// Split `total_stake` across two opposing prices so both sides pay out the
/// same amount. With `arbPct = 1/d1 + 1/d2 < 1` the common payout is
/// `total / arbPct` and the locked profit is positive.
pub fn arbitrage(odds_a: i32, odds_b: i32, total_stake: f64) -> Result<ArbitrageResult> {
    if total_stake <= 0.0 {
        return Err(AppError::validation("total stake must be positive"));
    }
    let d1 = odds::decimal_odds(odds_a)?;
    let d2 = odds::decimal_odds(odds_b)?;

    let arb_percentage = 1.0 / d1 + 1.0 / d2;
    if arb_percentage >= 1.0 {
        return Ok(ArbitrageResult {
            has_arbitrage: false,
            arb_percentage,
            stake_a: 0.0,
            stake_b: 0.0,
            payout: 0.0,
            guaranteed_profit: 0.0,
            roi_pct: 0.0,
        });
    }

    // Equal-payout split: stake_a·d1 == stake_b·d2.
    let stake_a = total_stake * d2 / (d1 + d2);
    let stake_b = total_stake - stake_a;
    let payout = (stake_a * d1).min(stake_b * d2);
    let guaranteed_profit = payout - total_stake;

    Ok(ArbitrageResult {
        has_arbitrage: true,
        arb_percentage,
        stake_a,
        stake_b,
        payout,
        guaranteed_profit,
        roi_pct: guaranteed_profit / total_stake * 100.0,
    })
}

// ---------------------------------------------------------------------------
// Hedging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeStrategy {
    /// Equal profit regardless of outcome.
    GuaranteedProfit,
    /// Break even if the original bet loses.
    MinimizeLoss,
    /// Partial hedge that lifts the worst case while keeping upside.
    MaximizeProfit,
}

impl HedgeStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "guaranteed_profit" => Some(HedgeStrategy::GuaranteedProfit),
            "minimize_loss" => Some(HedgeStrategy::MinimizeLoss),
            "maximize_profit" => Some(HedgeStrategy::MaximizeProfit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeVerdict {
    Recommend,
    Possible,
    NotRecommended,
}

#[derive(Debug, Clone, Serialize)]
pub struct HedgeResult {
    pub strategy: HedgeStrategy,
    pub hedge_stake: f64,
    pub profit_if_original_wins: f64,
    pub profit_if_hedge_wins: f64,
    pub guaranteed_profit: f64,
    pub total_exposure: f64,
    pub verdict: HedgeVerdict,
}

/// Size a hedge for an existing pending position against the counter
/// outcome's current price.
pub fn hedge(
    position: &Position,
    counter_odds: i32,
    strategy: HedgeStrategy,
) -> Result<HedgeResult> {
    if position.status != PositionStatus::Pending {
        return Err(AppError::validation(format!(
            "position {} is {}, only pending positions can be hedged",
            position.id, position.status
        )));
    }
    let s = position.stake;
    let d1 = odds::decimal_odds(position.american_odds)?;
    let d2 = odds::decimal_odds(counter_odds)?;

    let hedge_stake = match strategy {
        HedgeStrategy::GuaranteedProfit => s * d1 / d2,
        HedgeStrategy::MinimizeLoss => s / (d2 - 1.0),
        HedgeStrategy::MaximizeProfit => (s * d1 - s) / d2,
    };

    let profit_if_original_wins = s * d1 - s - hedge_stake;
    let profit_if_hedge_wins = hedge_stake * d2 - s - hedge_stake;
    let guaranteed_profit = profit_if_original_wins.min(profit_if_hedge_wins);

    let verdict = if guaranteed_profit >= s * HEDGE_RECOMMEND_PROFIT_PCT {
        HedgeVerdict::Recommend
    } else if guaranteed_profit >= 0.0 {
        HedgeVerdict::Possible
    } else {
        HedgeVerdict::NotRecommended
    };

    Ok(HedgeResult {
        strategy,
        hedge_stake,
        profit_if_original_wins,
        profit_if_hedge_wins,
        guaranteed_profit,
        total_exposure: s + hedge_stake,
        verdict,
    })
}
