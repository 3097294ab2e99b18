//! Row types for runtime sqlx queries, with conversions into domain types.

use crate::error::{AppError, Result};
use crate::types::{MarketKind, Position, PositionStatus, Quote};

#[derive(Debug, sqlx::FromRow)]
pub struct QuoteRow {
    pub venue: String,
    pub event_id: String,
    pub market: String,
    pub outcome: String,
    pub american_odds: i64,
    pub line: Option<f64>,
    pub observed_at: i64,
}

impl QuoteRow {
    pub fn into_quote(self) -> Result<Quote> {
        let market = MarketKind::parse(&self.market)
            .ok_or_else(|| AppError::validation(format!("unknown market kind: {}", self.market)))?;
        Ok(Quote {
            venue: self.venue,
            event_id: self.event_id,
            market,
            outcome: self.outcome,
            american_odds: self.american_odds as i32,
            line: self.line,
            observed_at: self.observed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PositionRow {
    pub id: i64,
    pub owner_id: String,
    pub event_id: String,
    pub sport: String,
    pub team: Option<String>,
    pub market: String,
    pub outcome: String,
    pub stake: f64,
    pub american_odds: i64,
    pub status: String,
    pub placed_at: i64,
    pub settled_at: Option<i64>,
    pub hedge_of: Option<i64>,
}

impl PositionRow {
    pub fn into_position(self) -> Result<Position> {
        let market = MarketKind::parse(&self.market)
            .ok_or_else(|| AppError::validation(format!("unknown market kind: {}", self.market)))?;
        let status = PositionStatus::parse(&self.status)
            .ok_or_else(|| AppError::validation(format!("unknown position status: {}", self.status)))?;
        Ok(Position {
            id: self.id,
            owner_id: self.owner_id,
            event_id: self.event_id,
            sport: self.sport,
            team: self.team,
            market,
            outcome: self.outcome,
            stake: self.stake,
            american_odds: self.american_odds as i32,
            status,
            placed_at: self.placed_at,
            settled_at: self.settled_at,
            hedge_of: self.hedge_of,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct BankrollRow {
    pub owner_id: String,
    pub current_amount: f64,
    pub starting_amount: f64,
    pub max_single_bet_pct: f64,
    pub max_daily_exposure_pct: f64,
    pub kelly_multiplier: f64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub sport: String,
    pub commence_time: i64,
    pub completed: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SplitRow {
    pub event_id: String,
    pub market: String,
    pub public_side: String,
    pub public_pct: f64,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct WarningRow {
    pub id: i64,
    pub owner_id: String,
    pub position_a: i64,
    pub position_b: i64,
    pub coefficient: f64,
    pub severity: String,
    pub acknowledged: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct SignalRow {
    pub event_id: String,
    pub market: String,
    pub signal_type: String,
    pub strength: String,
    pub confidence: f64,
    pub side: String,
    pub movement: f64,
    pub venue_count: i64,
    pub detected_at: i64,
}
