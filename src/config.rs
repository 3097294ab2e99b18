use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// Sizing
// ---------------------------------------------------------------------------

/// Fractional Kelly applied when an owner has no configured multiplier.
pub const DEFAULT_KELLY_MULTIPLIER: f64 = 0.25;

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Rule-table coefficients. Deterministic, not statistical — see the
/// CorrelationEstimator trait for the substitution seam.
pub mod correlation {
    /// Two positions on the same event.
    pub const SAME_EVENT: f64 = 0.9;
    /// Shared team within the same sport.
    pub const SHARED_TEAM: f64 = 0.7;
    /// Same sport, same calendar day, no shared team.
    pub const SAME_SPORT_SAME_DAY: f64 = 0.3;
    /// Everything else.
    pub const BASELINE: f64 = 0.1;

    /// Pairs at or above this coefficient produce a CorrelationWarning.
    pub const WARNING_THRESHOLD: f64 = 0.5;
    /// Portfolio mean above this sets the high-correlation flag.
    pub const PORTFOLIO_FLAG_THRESHOLD: f64 = 0.5;
}

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

pub mod tilt {
    /// Minimum settled bets before tilt analysis produces a score.
    pub const MIN_SETTLED_BETS: usize = 5;

    /// New bet within this many seconds of a loss counts as revenge betting.
    pub const REVENGE_WINDOW_SECS: i64 = 15 * 60;
    pub const REVENGE_WEIGHT: f64 = 30.0;
    pub const REVENGE_MIN_OCCURRENCES: usize = 2;

    /// Stake increase on the bet immediately after a loss.
    pub const CHASE_STAKE_INCREASE: f64 = 0.5;
    pub const CHASE_WEIGHT: f64 = 35.0;
    pub const CHASE_MIN_OCCURRENCES: usize = 2;

    /// A sport with at most this many lifetime bets is unfamiliar.
    pub const UNFAMILIAR_LIFETIME_MAX: usize = 2;
    pub const UNFAMILIAR_RECENT_MIN: usize = 2;
    pub const UNFAMILIAR_WEIGHT: f64 = 20.0;

    /// Local-hour window [23:00, 05:00) and the trigger count.
    pub const LATE_NIGHT_START_HOUR: u32 = 23;
    pub const LATE_NIGHT_END_HOUR: u32 = 5;
    pub const LATE_NIGHT_MIN_BETS: usize = 3;
    pub const LATE_NIGHT_WEIGHT: f64 = 15.0;

    pub const INCONSISTENCY_WEIGHT: f64 = 20.0;

    /// Score >= 50 blocks new bets; 30..50 warns only.
    pub const TILTING_THRESHOLD: f64 = 50.0;
    pub const MILD_TILT_THRESHOLD: f64 = 30.0;
}

/// Trailing history window for behavioral analysis (days).
pub const BEHAVIOR_WINDOW_DAYS: i64 = 30;

/// Consecutive bets under one hour apart count as a rapid-fire pair.
pub const RAPID_FIRE_GAP_SECS: i64 = 3600;

/// Hot/cold streak flags fire at this length.
pub const STREAK_FLAG_LEN: u32 = 3;

// ---------------------------------------------------------------------------
// Signal detection
// ---------------------------------------------------------------------------

pub mod signals {
    /// Trailing window for line-movement comparison (hours).
    pub const MOVEMENT_WINDOW_HOURS: i64 = 24;
    /// Trailing window for steam-move detection (minutes).
    pub const STEAM_WINDOW_MINS: i64 = 15;

    /// Line must move against the public side by at least this much.
    pub const RLM_MIN_MOVEMENT: f64 = 0.5;
    /// Public percentage constituting a majority side.
    pub const RLM_PUBLIC_MAJORITY_PCT: f64 = 50.0;

    /// Strength tier boundaries on movement magnitude.
    pub const RLM_MODERATE_MOVE: f64 = 1.0;
    pub const RLM_STRONG_MOVE: f64 = 1.5;

    /// Distinct venues required before a steam move fires.
    pub const STEAM_MIN_VENUES: usize = 3;
    pub const STEAM_STRONG_VENUES: usize = 4;
    pub const STEAM_VERY_STRONG_VENUES: usize = 5;

    /// Venues treated as historically sharp for consensus detection.
    pub const SHARP_VENUES: &[&str] = &["pinnacle", "circa", "bookmaker", "betcris"];
    /// Sharp lines within this many points of each other agree.
    pub const CONSENSUS_LINE_TOLERANCE: f64 = 0.5;
    pub const CONSENSUS_MIN_VENUES: usize = 2;
}

// ---------------------------------------------------------------------------
// Hedging
// ---------------------------------------------------------------------------

/// Guaranteed profit at or above this fraction of the original stake earns a
/// "recommend"; non-negative earns "possible".
pub const HEDGE_RECOMMEND_PROFIT_PCT: f64 = 0.05;

// ---------------------------------------------------------------------------
// Scheduler / API
// ---------------------------------------------------------------------------

/// Detector + exposure pass cadence (seconds).
pub const SCHEDULER_INTERVAL_SECS: u64 = 300;

/// Auth token cache entry lifetime (seconds).
pub const TOKEN_CACHE_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Offset applied to placement timestamps for the late-night tilt check
    /// (LOCAL_UTC_OFFSET_HOURS). Users are assumed to share one locale.
    pub local_utc_offset_hours: i32,
    /// Scheduled-pass cadence override (SCHEDULER_INTERVAL_SECS).
    pub scheduler_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "sharpline.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            local_utc_offset_hours: std::env::var("LOCAL_UTC_OFFSET_HOURS")
                .unwrap_or_else(|_| "0".to_string())
                .parse::<i32>()
                .unwrap_or(0),
            scheduler_interval_secs: std::env::var("SCHEDULER_INTERVAL_SECS")
                .unwrap_or_else(|_| SCHEDULER_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(SCHEDULER_INTERVAL_SECS),
        })
    }
}
