use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::db::{positions, risk};
use crate::error::Result;
use crate::exposure::{self, RuleBasedEstimator};
use crate::signals::SignalDetector;

/// Background loop: one signal-detection pass plus an exposure refresh for
/// every owner with open positions, on a fixed interval.
pub struct Scheduler {
    pool: sqlx::SqlitePool,
    interval_secs: u64,
}

impl Scheduler {
    pub fn new(pool: sqlx::SqlitePool, interval_secs: u64) -> Self {
        Self { pool, interval_secs }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        interval.tick().await; // consume immediate first tick

        loop {
            interval.tick().await;
            if let Err(e) = self.pass().await {
                error!("Scheduler pass failed: {e}");
            }
        }
    }

    async fn pass(&self) -> Result<()> {
        let now = Utc::now();

        let detector = SignalDetector::new(self.pool.clone());
        match detector.run_pass(now).await {
            Ok(s) => info!(
                "Signal pass: {} keys scanned, {} signals, {} lines tracked, {} failed",
                s.keys_scanned, s.signals_emitted, s.lines_tracked, s.keys_failed
            ),
            Err(e) => error!("Signal pass failed: {e}"),
        }

        let owners = positions::owners_with_pending(&self.pool).await?;
        let mut refreshed = 0usize;
        let mut failed = 0usize;
        for owner in &owners {
            if let Err(e) = self.refresh_owner(owner, now).await {
                warn!("Exposure refresh failed for {owner}: {e}");
                failed += 1;
            } else {
                refreshed += 1;
            }
        }
        if !owners.is_empty() {
            info!("Exposure pass: {refreshed} owners refreshed, {failed} failed");
        }
        Ok(())
    }

    async fn refresh_owner(&self, owner_id: &str, now: chrono::DateTime<Utc>) -> Result<()> {
        let pending = positions::pending_for_owner(&self.pool, owner_id).await?;
        let (summary, warnings) = exposure::compute(owner_id, &pending, &RuleBasedEstimator, now);
        risk::upsert_snapshot(&self.pool, &summary, now.timestamp()).await?;
        risk::upsert_warnings(&self.pool, owner_id, &warnings, now.timestamp()).await?;
        risk::retire_stale_warnings(&self.pool, owner_id).await?;
        Ok(())
    }
}
