use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Market / position vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    Spread,
    Total,
    Moneyline,
}

impl MarketKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "spread" => Some(MarketKind::Spread),
            "total" => Some(MarketKind::Total),
            "moneyline" => Some(MarketKind::Moneyline),
            _ => None,
        }
    }
}

impl std::fmt::Display for MarketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketKind::Spread => "spread",
            MarketKind::Total => "total",
            MarketKind::Moneyline => "moneyline",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Pending,
    Won,
    Lost,
    Push,
}

impl PositionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PositionStatus::Pending),
            "won" => Some(PositionStatus::Won),
            "lost" => Some(PositionStatus::Lost),
            "push" => Some(PositionStatus::Push),
            _ => None,
        }
    }

    pub fn is_settled(self) -> bool {
        self != PositionStatus::Pending
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PositionStatus::Pending => "pending",
            PositionStatus::Won => "won",
            PositionStatus::Lost => "lost",
            PositionStatus::Push => "push",
        };
        write!(f, "{s}")
    }
}

/// An open or settled wager. Stake and odds are immutable after placement;
/// only `status`/`settled_at` transition, and only forward from pending.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub id: i64,
    pub owner_id: String,
    pub event_id: String,
    pub sport: String,
    pub team: Option<String>,
    pub market: MarketKind,
    pub outcome: String,
    pub stake: f64,
    pub american_odds: i32,
    pub status: PositionStatus,
    pub placed_at: i64,
    pub settled_at: Option<i64>,
    /// Set when this position hedges another pending position.
    pub hedge_of: Option<i64>,
}

impl Position {
    pub fn placed_at_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.placed_at, 0)
            .single()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Bankroll {
    pub owner_id: String,
    pub current_amount: f64,
    pub starting_amount: f64,
    pub max_single_bet_pct: f64,
    pub max_daily_exposure_pct: f64,
    pub kelly_multiplier: f64,
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// One venue-native price observation. Immutable; newer quotes for the same
/// (event, market, venue, outcome) key supersede it in time-series queries.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub venue: String,
    pub event_id: String,
    pub market: MarketKind,
    pub outcome: String,
    pub american_odds: i32,
    pub line: Option<f64>,
    pub observed_at: i64,
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    ReverseLineMovement,
    SteamMove,
    SharpConsensus,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalKind::ReverseLineMovement => "reverse_line_movement",
            SignalKind::SteamMove => "steam_move",
            SignalKind::SharpConsensus => "sharp_consensus",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl std::fmt::Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strength::Weak => "weak",
            Strength::Moderate => "moderate",
            Strength::Strong => "strong",
            Strength::VeryStrong => "very_strong",
        };
        write!(f, "{s}")
    }
}

/// A detected market signal, keyed (event, market, type). Later detection
/// passes supersede earlier rows for the same key; consumers read the latest
/// by `detected_at`.
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub event_id: String,
    pub market: MarketKind,
    pub signal_type: SignalKind,
    pub strength: Strength,
    pub confidence: f64,
    pub side: String,
    pub movement: f64,
    pub venue_count: u32,
    pub detected_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDirection {
    TowardFavorite,
    TowardUnderdog,
    Unchanged,
}

impl std::fmt::Display for LineDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LineDirection::TowardFavorite => "toward_favorite",
            LineDirection::TowardUnderdog => "toward_underdog",
            LineDirection::Unchanged => "unchanged",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Risk vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Tier boundaries at 0.5 / 0.6 / 0.8. Warnings are only built for
    /// coefficients >= 0.5, so anything below maps to Low.
    pub fn from_coefficient(c: f64) -> Self {
        if c >= 0.8 {
            Severity::High
        } else if c >= 0.6 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryBand {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl AdvisoryBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            AdvisoryBand::Excellent
        } else if score >= 60.0 {
            AdvisoryBand::Good
        } else if score >= 40.0 {
            AdvisoryBand::Fair
        } else if score >= 20.0 {
            AdvisoryBand::Poor
        } else {
            AdvisoryBand::Critical
        }
    }
}

impl std::fmt::Display for AdvisoryBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdvisoryBand::Excellent => "excellent",
            AdvisoryBand::Good => "good",
            AdvisoryBand::Fair => "fair",
            AdvisoryBand::Poor => "poor",
            AdvisoryBand::Critical => "critical",
        };
        write!(f, "{s}")
    }
}
