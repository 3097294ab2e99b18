//! Position and bankroll reads, plus the settlement transition — the one
//! place a position's status is allowed to change.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::db::models::{BankrollRow, PositionRow};
use crate::error::{AppError, Result};
use crate::odds;
use crate::types::{Bankroll, Position, PositionStatus};

pub async fn pending_for_owner(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Position>> {
    let rows: Vec<PositionRow> = sqlx::query_as(
        r#"
        SELECT id, owner_id, event_id, sport, team, market, outcome,
               stake, american_odds, status, placed_at, settled_at, hedge_of
        FROM positions
        WHERE owner_id = ? AND status = 'pending'
        ORDER BY placed_at ASC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(PositionRow::into_position).collect()
}

/// Trailing history (all statuses) since `cutoff`, ascending by placement.
pub async fn history_since(
    pool: &SqlitePool,
    owner_id: &str,
    cutoff: i64,
) -> Result<Vec<Position>> {
    let rows: Vec<PositionRow> = sqlx::query_as(
        r#"
        SELECT id, owner_id, event_id, sport, team, market, outcome,
               stake, american_odds, status, placed_at, settled_at, hedge_of
        FROM positions
        WHERE owner_id = ? AND placed_at >= ?
        ORDER BY placed_at ASC
        "#,
    )
    .bind(owner_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(PositionRow::into_position).collect()
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Position> {
    let row: Option<PositionRow> = sqlx::query_as(
        r#"
        SELECT id, owner_id, event_id, sport, team, market, outcome,
               stake, american_odds, status, placed_at, settled_at, hedge_of
        FROM positions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.ok_or_else(|| AppError::NotFound(format!("position {id}")))?
        .into_position()
}

/// Lifetime bet counts per sport, for the unfamiliar-market tilt check.
pub async fn lifetime_sport_counts(
    pool: &SqlitePool,
    owner_id: &str,
) -> Result<HashMap<String, usize>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT sport, COUNT(*) FROM positions WHERE owner_id = ? GROUP BY sport")
            .bind(owner_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(s, n)| (s, n as usize)).collect())
}

/// Owners with at least one pending position, for scheduled exposure passes.
pub async fn owners_with_pending(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT owner_id FROM positions WHERE status = 'pending'")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(o,)| o).collect())
}

pub async fn bankroll(pool: &SqlitePool, owner_id: &str) -> Result<Bankroll> {
    let row: Option<BankrollRow> = sqlx::query_as(
        r#"
        SELECT owner_id, current_amount, starting_amount,
               max_single_bet_pct, max_daily_exposure_pct, kelly_multiplier
        FROM bankrolls
        WHERE owner_id = ?
        "#,
    )
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;
    let r = row.ok_or_else(|| AppError::NotFound(format!("bankroll for owner {owner_id}")))?;
    Ok(Bankroll {
        owner_id: r.owner_id,
        current_amount: r.current_amount,
        starting_amount: r.starting_amount,
        max_single_bet_pct: r.max_single_bet_pct,
        max_daily_exposure_pct: r.max_daily_exposure_pct,
        kelly_multiplier: r.kelly_multiplier,
    })
}

/// Explicit deposit (positive) or withdrawal (negative). Withdrawals past
/// the current balance are rejected.
pub async fn adjust_bankroll(pool: &SqlitePool, owner_id: &str, amount: f64) -> Result<Bankroll> {
    if amount == 0.0 || !amount.is_finite() {
        return Err(AppError::validation("adjustment amount must be a non-zero number"));
    }
    let current = bankroll(pool, owner_id).await?;
    if current.current_amount + amount < 0.0 {
        return Err(AppError::validation(format!(
            "withdrawal of {:.2} exceeds the current balance of {:.2}",
            -amount, current.current_amount
        )));
    }
    sqlx::query("UPDATE bankrolls SET current_amount = current_amount + ? WHERE owner_id = ?")
        .bind(amount)
        .bind(owner_id)
        .execute(pool)
        .await?;
    bankroll(pool, owner_id).await
}

/// Settle a pending position and apply the bankroll delta in one
/// transaction. Transitions only run forward: pending → won/lost/push.
pub async fn settle(
    pool: &SqlitePool,
    position_id: i64,
    outcome: PositionStatus,
    settled_at: i64,
) -> Result<Position> {
    if !outcome.is_settled() {
        return Err(AppError::validation("settlement status must be won, lost or push"));
    }

    let mut tx = pool.begin().await?;

    let row: Option<PositionRow> = sqlx::query_as(
        r#"
        SELECT id, owner_id, event_id, sport, team, market, outcome,
               stake, american_odds, status, placed_at, settled_at, hedge_of
        FROM positions
        WHERE id = ?
        "#,
    )
    .bind(position_id)
    .fetch_optional(&mut *tx)
    .await?;
    let mut position = row
        .ok_or_else(|| AppError::NotFound(format!("position {position_id}")))?
        .into_position()?;

    if position.status != PositionStatus::Pending {
        return Err(AppError::validation(format!(
            "position {position_id} is already {}, settlement cannot run backward",
            position.status
        )));
    }

    let delta = match outcome {
        PositionStatus::Won => position.stake * (odds::decimal_odds(position.american_odds)? - 1.0),
        PositionStatus::Lost => -position.stake,
        PositionStatus::Push | PositionStatus::Pending => 0.0,
    };

    sqlx::query("UPDATE positions SET status = ?, settled_at = ? WHERE id = ?")
        .bind(outcome.to_string())
        .bind(settled_at)
        .bind(position_id)
        .execute(&mut *tx)
        .await?;

    if delta != 0.0 {
        sqlx::query("UPDATE bankrolls SET current_amount = current_amount + ? WHERE owner_id = ?")
            .bind(delta)
            .bind(&position.owner_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    position.status = outcome;
    position.settled_at = Some(settled_at);
    Ok(position)
}
