//! Bet-approval composition: risk limits, tilt state, and exposure warnings
//! folded into one accept/block decision.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::behavior::BehaviorReport;
use crate::error::{AppError, Result};
use crate::exposure::ExposureSummary;
use crate::types::{Bankroll, Position};

#[derive(Debug, Clone, Serialize)]
pub struct RiskLimitCheck {
    pub max_single_bet: f64,
    pub daily_exposure_cap: f64,
    pub daily_exposure_used: f64,
    pub within_single_bet_limit: bool,
    pub within_daily_limit: bool,
}

/// Check a proposed stake against the owner's configured limits. Daily
/// exposure counts stakes of pending positions placed on the current UTC day.
pub fn check_risk_limits(
    bankroll: &Bankroll,
    pending: &[Position],
    proposed_stake: f64,
    now: DateTime<Utc>,
) -> Result<RiskLimitCheck> {
    if proposed_stake <= 0.0 {
        return Err(AppError::validation("proposed stake must be positive"));
    }
    if bankroll.current_amount <= 0.0 {
        return Err(AppError::validation("bankroll must be positive"));
    }

    let max_single_bet = bankroll.current_amount * bankroll.max_single_bet_pct;
    let daily_exposure_cap = bankroll.current_amount * bankroll.max_daily_exposure_pct;

    let today = now.date_naive();
    let daily_exposure_used: f64 = pending
        .iter()
        .filter(|p| p.placed_at_utc().date_naive() == today)
        .map(|p| p.stake)
        .sum();

    Ok(RiskLimitCheck {
        max_single_bet,
        daily_exposure_cap,
        daily_exposure_used,
        within_single_bet_limit: proposed_stake <= max_single_bet,
        within_daily_limit: daily_exposure_used + proposed_stake <= daily_exposure_cap,
    })
}

/// Blocking reasons ("must fix") are kept apart from advisory warnings
/// ("be aware") so callers can render both.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalDecision {
    pub approved: bool,
    pub blocks: Vec<String>,
    pub warnings: Vec<String>,
    pub risk: RiskLimitCheck,
}

pub fn evaluate(
    bankroll: &Bankroll,
    pending: &[Position],
    exposure: &ExposureSummary,
    behavior: &BehaviorReport,
    proposed_stake: f64,
    now: DateTime<Utc>,
) -> Result<ApprovalDecision> {
    let risk = check_risk_limits(bankroll, pending, proposed_stake, now)?;

    let mut blocks = Vec::new();
    let mut warnings = Vec::new();

    if !risk.within_single_bet_limit {
        blocks.push(format!(
            "stake {:.2} exceeds the single-bet limit of {:.2}",
            proposed_stake, risk.max_single_bet
        ));
    }
    if !risk.within_daily_limit {
        blocks.push(format!(
            "stake {:.2} would push today's exposure past the cap of {:.2} ({:.2} already at risk)",
            proposed_stake, risk.daily_exposure_cap, risk.daily_exposure_used
        ));
    }

    match behavior {
        BehaviorReport::Ok(bundle) => {
            if bundle.tilt.is_tilting {
                blocks.push(format!(
                    "tilt score {:.0} is above the blocking threshold",
                    bundle.tilt.score
                ));
            } else if bundle.tilt.is_mild_tilt {
                warnings.push(format!(
                    "mild tilt indicators (score {:.0}); consider slowing down",
                    bundle.tilt.score
                ));
            }
            if bundle.frequency.over_betting {
                warnings.push(format!(
                    "{} bets in the last 24 hours is well above your usual pace",
                    bundle.frequency.bets_last_24h
                ));
            }
        }
        // Thin history cannot block a bet.
        BehaviorReport::InsufficientData { .. } => {}
    }

    if exposure.high_correlation {
        warnings.push(format!(
            "open positions are highly correlated (portfolio score {:.2})",
            exposure.correlation_score
        ));
    }

    Ok(ApprovalDecision {
        approved: blocks.is_empty(),
        blocks,
        warnings,
        risk,
    })
}
