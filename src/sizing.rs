//! Kelly-criterion stake sizing.

use serde::Serialize;

use crate::config::DEFAULT_KELLY_MULTIPLIER;
use crate::error::{AppError, Result};
use crate::odds;

#[derive(Debug, Clone, Copy)]
pub struct SizingInput {
    /// Caller's win-probability estimate, exclusive (0, 1).
    pub win_probability: f64,
    pub american_odds: i32,
    pub bankroll: f64,
    /// Fractional Kelly multiplier; None falls back to the default quarter-Kelly.
    pub multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StakeRecommendation {
    pub recommended_stake: f64,
    pub full_kelly_stake: f64,
    pub kelly_fraction: f64,
    pub multiplier: f64,
    /// Edge per unit staked, as a percentage.
    pub expected_value_pct: f64,
    /// Heuristic ruin probability in [0, 1] — illustrative, not a rigorous
    /// gambler's-ruin closed form.
    pub risk_of_ruin: f64,
    pub has_edge: bool,
}

/// Size a stake with fractional Kelly.
///
/// `f* = (b·p − q) / b` where `b` is net decimal odds and `q = 1 − p`.
/// A non-positive `f*` means the odds do not justify any bet.
pub fn size_stake(input: SizingInput) -> Result<StakeRecommendation> {
    if input.bankroll <= 0.0 {
        return Err(AppError::validation("bankroll must be positive"));
    }
    if input.win_probability <= 0.0 || input.win_probability >= 1.0 {
        return Err(AppError::validation(
            "win probability must be strictly between 0 and 1",
        ));
    }
    let multiplier = input.multiplier.unwrap_or(DEFAULT_KELLY_MULTIPLIER);
    if multiplier <= 0.0 || multiplier > 1.0 {
        return Err(AppError::validation("kelly multiplier must be in (0, 1]"));
    }

    let p = input.win_probability;
    let q = 1.0 - p;
    let b = odds::decimal_odds(input.american_odds)? - 1.0;

    let full_kelly = (b * p - q) / b;
    let edge = p * b - q;
    let has_edge = full_kelly > 0.0;

    let (recommended_stake, full_kelly_stake) = if has_edge {
        (
            input.bankroll * full_kelly * multiplier,
            input.bankroll * full_kelly,
        )
    } else {
        (0.0, 0.0)
    };

    Ok(StakeRecommendation {
        recommended_stake,
        full_kelly_stake,
        kelly_fraction: full_kelly.max(0.0),
        multiplier,
        expected_value_pct: edge * 100.0,
        risk_of_ruin: risk_of_ruin(edge, input.bankroll, recommended_stake),
        has_edge,
    })
}

/// Variance-based ruin heuristic: `((1 − edge) / (1 + edge))^units` with
/// units of bankroll at the recommended stake. With no edge the estimate
/// saturates at 1.0. A simplification of the true gambler's-ruin probability,
/// kept for parity with the advisory output it feeds.
fn risk_of_ruin(edge: f64, bankroll: f64, stake: f64) -> f64 {
    if edge <= 0.0 || stake <= 0.0 {
        return 1.0;
    }
    let units = bankroll / stake;
    // Edge above 1 would flip the ratio negative and NaN out under a
    // fractional exponent; floor it at zero ruin instead.
    let ratio = ((1.0 - edge) / (1.0 + edge)).max(0.0);
    ratio.powf(units).clamp(0.0, 1.0)
}
