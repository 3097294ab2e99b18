//! Quote, event, and betting-split reads for the signal detector.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::db::models::{EventRow, QuoteRow, SplitRow};
use crate::error::Result;
use crate::signals::movement::PublicSplit;
use crate::types::{MarketKind, Quote};

/// All quotes observed since `cutoff`, grouped by (event, market) key with
/// each group ascending in observation time. Rows with an unknown market
/// label are skipped rather than failing the pass.
pub async fn quotes_since(
    pool: &SqlitePool,
    cutoff: i64,
) -> Result<HashMap<(String, MarketKind), Vec<Quote>>> {
    let rows: Vec<QuoteRow> = sqlx::query_as(
        r#"
        SELECT venue, event_id, market, outcome, american_odds, line, observed_at
        FROM quotes
        WHERE observed_at >= ?
        ORDER BY event_id, market, observed_at ASC
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<(String, MarketKind), Vec<Quote>> = HashMap::new();
    for row in rows {
        let Ok(quote) = row.into_quote() else { continue };
        grouped
            .entry((quote.event_id.clone(), quote.market))
            .or_default()
            .push(quote);
    }
    Ok(grouped)
}

/// Public betting percentage per (event, market) key.
pub async fn betting_splits(
    pool: &SqlitePool,
) -> Result<HashMap<(String, MarketKind), PublicSplit>> {
    let rows: Vec<SplitRow> =
        sqlx::query_as("SELECT event_id, market, public_side, public_pct FROM betting_splits")
            .fetch_all(pool)
            .await?;

    let mut splits = HashMap::new();
    for row in rows {
        let Some(market) = MarketKind::parse(&row.market) else { continue };
        splits.insert(
            (row.event_id, market),
            PublicSplit {
                side: row.public_side,
                pct: row.public_pct,
            },
        );
    }
    Ok(splits)
}

/// Commence times keyed by event id, for opening/closing finalization.
pub async fn event_commence_times(pool: &SqlitePool) -> Result<HashMap<String, i64>> {
    let rows: Vec<EventRow> =
        sqlx::query_as("SELECT id, sport, commence_time, completed FROM events")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|e| (e.id, e.commence_time)).collect())
}
