//! Scheduled market-signal detection over persisted quote history.

pub mod lines;
pub mod movement;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::config::signals as cfg;
use crate::db::{quotes, risk};
use crate::error::Result;
use crate::types::Signal;

/// Per-pass summary; the scheduled trigger reports these counts rather than
/// full payloads.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PassSummary {
    pub keys_scanned: usize,
    pub signals_emitted: usize,
    pub lines_tracked: usize,
    /// Keys with at least one failed write.
    pub keys_failed: usize,
}

pub struct SignalDetector {
    pool: SqlitePool,
}

impl SignalDetector {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One detection pass. Detection per key is independent: a failed key is
    /// logged and skipped, never aborting the rest of the pass. Signal rows
    /// are upserted latest-wins, so overlapping passes converge.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassSummary> {
        let movement_cutoff = (now - Duration::hours(cfg::MOVEMENT_WINDOW_HOURS)).timestamp();
        let steam_cutoff = (now - Duration::minutes(cfg::STEAM_WINDOW_MINS)).timestamp();

        let grouped = quotes::quotes_since(&self.pool, movement_cutoff).await?;
        let splits = quotes::betting_splits(&self.pool).await?;
        let commence_times = quotes::event_commence_times(&self.pool).await?;

        let mut summary = PassSummary::default();

        for ((event_id, market), key_quotes) in &grouped {
            summary.keys_scanned += 1;
            // A key counts as failed once, however many of its writes fail.
            let mut key_failed = false;

            let mut drafts = Vec::new();
            if let Some(split) = splits.get(&(event_id.clone(), *market)) {
                if let Some(rlm) = movement::detect_rlm(key_quotes, split) {
                    drafts.push(rlm);
                }
            }

            let recent: Vec<_> = key_quotes
                .iter()
                .filter(|q| q.observed_at >= steam_cutoff)
                .cloned()
                .collect();
            if let Some(steam) = movement::detect_steam(&recent) {
                drafts.push(steam);
            }

            if let Some(consensus) = movement::detect_sharp_consensus(key_quotes) {
                drafts.push(consensus);
            }

            for draft in drafts {
                let signal = Signal {
                    event_id: event_id.clone(),
                    market: *market,
                    signal_type: draft.signal_type,
                    strength: draft.strength,
                    confidence: draft.confidence,
                    side: draft.side,
                    movement: draft.movement,
                    venue_count: draft.venue_count,
                    detected_at: now.timestamp(),
                };
                match risk::upsert_signal(&self.pool, &signal).await {
                    Ok(()) => {
                        debug!(
                            event_id = %signal.event_id,
                            market = %signal.market,
                            signal_type = %signal.signal_type,
                            strength = %signal.strength,
                            "signal emitted"
                        );
                        summary.signals_emitted += 1;
                    }
                    Err(e) => {
                        warn!(event_id = %event_id, market = %market, "signal write failed: {e}");
                        key_failed = true;
                    }
                }
            }

            // Opening/closing tracking needs a known commence time; the row
            // freezes once the event starts. Track the key's most-quoted
            // outcome so the series never mixes both sides of the market.
            if let Some(&commence) = commence_times.get(event_id.as_str()) {
                let side_quotes = canonical_outcome_quotes(key_quotes);
                if let Some(track) = lines::track(&side_quotes) {
                    let finalized = now.timestamp() >= commence;
                    match risk::upsert_event_line(&self.pool, event_id, *market, &track, finalized)
                        .await
                    {
                        Ok(()) => summary.lines_tracked += 1,
                        Err(e) => {
                            warn!(event_id = %event_id, "line tracking write failed: {e}");
                            key_failed = true;
                        }
                    }
                }
            }

            if key_failed {
                summary.keys_failed += 1;
            }
        }

        Ok(summary)
    }
}

/// Quotes for the outcome with the most observations in the key, preserving
/// time order. Ties break lexicographically for determinism.
fn canonical_outcome_quotes(key_quotes: &[crate::types::Quote]) -> Vec<crate::types::Quote> {
    let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for q in key_quotes {
        *counts.entry(q.outcome.as_str()).or_insert(0) += 1;
    }
    let Some(outcome) = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(o, _)| o.to_string())
    else {
        return Vec::new();
    };
    key_quotes
        .iter()
        .filter(|q| q.outcome == outcome)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::TimeZone;

    async fn insert_quote(
        pool: &SqlitePool,
        venue: &str,
        event: &str,
        market: &str,
        outcome: &str,
        line: f64,
        observed_at: i64,
    ) {
        sqlx::query(
            r#"
            INSERT INTO quotes (venue, event_id, market, outcome, american_odds, line, observed_at)
            VALUES (?, ?, ?, ?, -110, ?, ?)
            "#,
        )
        .bind(venue)
        .bind(event)
        .bind(market)
        .bind(outcome)
        .bind(line)
        .bind(observed_at)
        .execute(pool)
        .await
        .unwrap();
    }

    const T0: i64 = 1_700_000_000;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[tokio::test]
    async fn pass_emits_steam_for_three_fresh_venues() {
        let pool = test_pool().await;
        for (i, venue) in ["venue_a", "venue_b", "venue_c"].iter().enumerate() {
            insert_quote(&pool, venue, "evt1", "spread", "home", -3.5, T0 - 60 + i as i64).await;
        }

        let detector = SignalDetector::new(pool.clone());
        let summary = detector.run_pass(at(T0)).await.unwrap();
        assert_eq!(summary.keys_scanned, 1);
        assert_eq!(summary.signals_emitted, 1);
        assert_eq!(summary.keys_failed, 0);

        let rows = risk::recent_signals(&pool, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].signal_type, "steam_move");
    }

    #[tokio::test]
    async fn stale_quotes_do_not_steam() {
        let pool = test_pool().await;
        // Three venues, but all updated over an hour ago.
        for venue in ["venue_a", "venue_b", "venue_c"] {
            insert_quote(&pool, venue, "evt1", "spread", "home", -3.5, T0 - 7200).await;
        }
        let detector = SignalDetector::new(pool.clone());
        let summary = detector.run_pass(at(T0)).await.unwrap();
        assert_eq!(summary.signals_emitted, 0);
    }

    #[tokio::test]
    async fn rlm_and_line_tracking_pass() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO events (id, sport, commence_time) VALUES ('evt1', 'basketball', ?)",
        )
        .bind(T0 + 7200)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO betting_splits (event_id, market, public_side, public_pct, updated_at) VALUES ('evt1', 'spread', 'home', 70.0, ?)",
        )
        .bind(T0)
        .execute(&pool)
        .await
        .unwrap();
        // 70% public on home, yet home's number improved by a point and a
        // half: a reverse move with away as the sharp side.
        insert_quote(&pool, "venue_a", "evt1", "spread", "home", -3.0, T0 - 7200).await;
        insert_quote(&pool, "venue_a", "evt1", "spread", "away", 3.0, T0 - 7200).await;
        insert_quote(&pool, "venue_a", "evt1", "spread", "home", -1.5, T0 - 600).await;

        let detector = SignalDetector::new(pool.clone());
        let summary = detector.run_pass(at(T0)).await.unwrap();
        assert_eq!(summary.signals_emitted, 1);
        assert_eq!(summary.lines_tracked, 1);

        let rows = risk::recent_signals(&pool, 10).await.unwrap();
        assert_eq!(rows[0].signal_type, "reverse_line_movement");
        assert_eq!(rows[0].side, "away");
        assert_eq!(rows[0].strength, "strong");

        // Event has not commenced: the line row is still open.
        let (finalized,): (i64,) =
            sqlx::query_as("SELECT finalized FROM event_lines WHERE event_id = 'evt1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(finalized, 0);
    }

    #[tokio::test]
    async fn failed_key_counts_once_despite_multiple_failed_writes() {
        let pool = test_pool().await;
        // Three sharp venues inside tolerance: the key yields both a steam
        // and a consensus draft.
        for (i, venue) in ["pinnacle", "circa", "bookmaker"].iter().enumerate() {
            insert_quote(&pool, venue, "evt1", "spread", "home", -3.0, T0 - 60 + i as i64).await;
        }
        sqlx::query("DROP TABLE signals").execute(&pool).await.unwrap();

        let detector = SignalDetector::new(pool.clone());
        let summary = detector.run_pass(at(T0)).await.unwrap();
        assert_eq!(summary.keys_scanned, 1);
        assert_eq!(summary.signals_emitted, 0);
        assert_eq!(summary.keys_failed, 1);
    }

    #[tokio::test]
    async fn repeated_pass_supersedes_signals() {
        let pool = test_pool().await;
        for (i, venue) in ["venue_a", "venue_b", "venue_c"].iter().enumerate() {
            insert_quote(&pool, venue, "evt1", "total", "over", 44.5, T0 - 60 + i as i64).await;
        }
        let detector = SignalDetector::new(pool.clone());
        detector.run_pass(at(T0)).await.unwrap();
        detector.run_pass(at(T0 + 60)).await.unwrap();

        let rows = risk::recent_signals(&pool, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].detected_at, T0 + 60);
    }
}
