mod api;
mod approval;
mod behavior;
mod config;
mod db;
mod error;
mod exposure;
mod hedge;
mod odds;
mod scheduler;
mod signals;
mod sizing;
mod types;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    // Scheduled signal-detection and exposure passes (background)
    let scheduler = Scheduler::new(pool.clone(), cfg.scheduler_interval_secs);
    tokio::spawn(async move { scheduler.run().await });
    info!(
        "Scheduler running every {}s",
        cfg.scheduler_interval_secs
    );

    // HTTP API server
    let api_state = ApiState::new(pool, cfg.local_utc_offset_hours);
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
