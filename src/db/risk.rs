//! Upserts for engine-derived rows: snapshots, warnings, signals, lines,
//! sizing audits, and tilt assessments. Every write here is keyed so a
//! repeated pass lands on the same row.

use sqlx::SqlitePool;

use crate::db::models::{SignalRow, WarningRow};
use crate::error::Result;
use crate::exposure::{ExposureSummary, PairWarning};
use crate::signals::lines::LineTrack;
use crate::types::{MarketKind, Signal};

pub async fn upsert_snapshot(
    pool: &SqlitePool,
    summary: &ExposureSummary,
    computed_at: i64,
) -> Result<()> {
    let by_sport = serde_json::to_string(&summary.by_sport)?;
    let by_market = serde_json::to_string(&summary.by_market)?;
    sqlx::query(
        r#"
        INSERT INTO exposure_snapshots (
            owner_id, snapshot_date, total_at_risk, total_potential_payout,
            open_positions, by_sport, by_market, correlation_score,
            high_correlation, computed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(owner_id, snapshot_date) DO UPDATE SET
            total_at_risk = excluded.total_at_risk,
            total_potential_payout = excluded.total_potential_payout,
            open_positions = excluded.open_positions,
            by_sport = excluded.by_sport,
            by_market = excluded.by_market,
            correlation_score = excluded.correlation_score,
            high_correlation = excluded.high_correlation,
            computed_at = excluded.computed_at
        "#,
    )
    .bind(&summary.owner_id)
    .bind(&summary.snapshot_date)
    .bind(summary.total_at_risk)
    .bind(summary.total_potential_payout)
    .bind(i64::from(summary.open_positions))
    .bind(by_sport)
    .bind(by_market)
    .bind(summary.correlation_score)
    .bind(i64::from(summary.high_correlation))
    .bind(computed_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Upsert one warning per pair; acknowledgement survives re-detection.
pub async fn upsert_warnings(
    pool: &SqlitePool,
    owner_id: &str,
    warnings: &[PairWarning],
    created_at: i64,
) -> Result<u64> {
    let mut written = 0u64;
    for w in warnings {
        let result = sqlx::query(
            r#"
            INSERT INTO correlation_warnings (
                owner_id, position_a, position_b, coefficient, severity, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(position_a, position_b) DO UPDATE SET
                coefficient = excluded.coefficient,
                severity = excluded.severity
            "#,
        )
        .bind(owner_id)
        .bind(w.position_a)
        .bind(w.position_b)
        .bind(w.coefficient)
        .bind(w.severity.to_string())
        .bind(created_at)
        .execute(pool)
        .await?;
        written += result.rows_affected();
    }
    Ok(written)
}

/// Drop unacknowledged warnings whose pair is no longer fully pending, so a
/// warning always references two open positions. Acknowledged rows stay for
/// audit; they never reach active reads.
pub async fn retire_stale_warnings(pool: &SqlitePool, owner_id: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM correlation_warnings
        WHERE owner_id = ? AND acknowledged = 0
          AND (
            position_a NOT IN (SELECT id FROM positions WHERE status = 'pending')
            OR position_b NOT IN (SELECT id FROM positions WHERE status = 'pending')
          )
        "#,
    )
    .bind(owner_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn active_warnings(pool: &SqlitePool, owner_id: &str) -> Result<Vec<WarningRow>> {
    let rows: Vec<WarningRow> = sqlx::query_as(
        r#"
        SELECT id, owner_id, position_a, position_b, coefficient, severity,
               acknowledged, created_at
        FROM correlation_warnings
        WHERE owner_id = ? AND acknowledged = 0
        ORDER BY coefficient DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Soft-delete: the row stays for audit but drops out of active reads.
pub async fn acknowledge_warning(pool: &SqlitePool, owner_id: &str, id: i64) -> Result<bool> {
    let result =
        sqlx::query("UPDATE correlation_warnings SET acknowledged = 1 WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Latest-wins per (event, market, type) key.
pub async fn upsert_signal(pool: &SqlitePool, signal: &Signal) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO signals (
            event_id, market, signal_type, strength, confidence,
            side, movement, venue_count, detected_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(event_id, market, signal_type) DO UPDATE SET
            strength = excluded.strength,
            confidence = excluded.confidence,
            side = excluded.side,
            movement = excluded.movement,
            venue_count = excluded.venue_count,
            detected_at = excluded.detected_at
        "#,
    )
    .bind(&signal.event_id)
    .bind(signal.market.to_string())
    .bind(signal.signal_type.to_string())
    .bind(signal.strength.to_string())
    .bind(signal.confidence)
    .bind(&signal.side)
    .bind(signal.movement)
    .bind(i64::from(signal.venue_count))
    .bind(signal.detected_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn recent_signals(pool: &SqlitePool, limit: i64) -> Result<Vec<SignalRow>> {
    let rows: Vec<SignalRow> = sqlx::query_as(
        r#"
        SELECT event_id, market, signal_type, strength, confidence,
               side, movement, venue_count, detected_at
        FROM signals
        ORDER BY detected_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Updated in place as quotes arrive; `finalized` freezes the row once the
/// event has commenced.
pub async fn upsert_event_line(
    pool: &SqlitePool,
    event_id: &str,
    market: MarketKind,
    track: &LineTrack,
    finalized: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO event_lines (
            event_id, market, opening_line, opening_odds, opened_at,
            closing_line, closing_odds, closed_at, movement, direction, finalized
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(event_id, market) DO UPDATE SET
            closing_line = excluded.closing_line,
            closing_odds = excluded.closing_odds,
            closed_at = excluded.closed_at,
            movement = excluded.movement,
            direction = excluded.direction,
            finalized = excluded.finalized
        WHERE event_lines.finalized = 0
        "#,
    )
    .bind(event_id)
    .bind(market.to_string())
    .bind(track.opening_line)
    .bind(i64::from(track.opening_odds))
    .bind(track.opened_at)
    .bind(track.closing_line)
    .bind(i64::from(track.closing_odds))
    .bind(track.closed_at)
    .bind(track.movement)
    .bind(track.direction.to_string())
    .bind(i64::from(finalized))
    .execute(pool)
    .await?;
    Ok(())
}

/// Audit row for every sizing call.
pub async fn insert_stake_recommendation(
    pool: &SqlitePool,
    owner_id: &str,
    win_probability: f64,
    american_odds: i32,
    recommended_stake: f64,
    full_kelly_stake: f64,
    expected_value_pct: f64,
    created_at: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stake_recommendations (
            owner_id, win_probability, american_odds, recommended_stake,
            full_kelly_stake, expected_value_pct, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(owner_id)
    .bind(win_probability)
    .bind(i64::from(american_odds))
    .bind(recommended_stake)
    .bind(full_kelly_stake)
    .bind(expected_value_pct)
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn recommended_stakes_since(
    pool: &SqlitePool,
    owner_id: &str,
    cutoff: i64,
) -> Result<Vec<f64>> {
    let rows: Vec<(f64,)> = sqlx::query_as(
        r#"
        SELECT recommended_stake FROM stake_recommendations
        WHERE owner_id = ? AND created_at >= ?
        ORDER BY created_at ASC
        "#,
    )
    .bind(owner_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(s,)| s).collect())
}

/// Latest-view-only storage for tilt output.
pub async fn upsert_tilt_assessment(
    pool: &SqlitePool,
    owner_id: &str,
    score: f64,
    indicators_json: &str,
    recommendation: &str,
    computed_at: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tilt_assessments (owner_id, score, indicators, recommendation, computed_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(owner_id) DO UPDATE SET
            score = excluded.score,
            indicators = excluded.indicators,
            recommendation = excluded.recommendation,
            computed_at = excluded.computed_at
        "#,
    )
    .bind(owner_id)
    .bind(score)
    .bind(indicators_json)
    .bind(recommendation)
    .bind(computed_at)
    .execute(pool)
    .await?;
    Ok(())
}
