//! Reverse-line-movement, steam-move, and sharp-consensus detection over a
//! single (event, market) key's quote history.

use std::collections::HashSet;

use crate::config::signals as cfg;
use crate::types::{Quote, SignalKind, Strength};

/// Detector output before persistence stamps key and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDraft {
    pub signal_type: SignalKind,
    pub strength: Strength,
    pub confidence: f64,
    pub side: String,
    pub movement: f64,
    pub venue_count: u32,
}

/// Majority public side for a key, from auxiliary betting-percentage data.
#[derive(Debug, Clone)]
pub struct PublicSplit {
    pub side: String,
    pub pct: f64,
}

/// Reverse line movement: the line moved opposite the majority public money
/// by at least half a point, marking the other side as sharp.
///
/// `quotes` is the key's full movement window sorted ascending by
/// observation time; movement always compares the earliest and latest
/// entries for the public side, never an arbitrary pair.
pub fn detect_rlm(quotes: &[Quote], split: &PublicSplit) -> Option<SignalDraft> {
    if split.pct <= cfg::RLM_PUBLIC_MAJORITY_PCT {
        return None;
    }
    let public: Vec<&Quote> = quotes
        .iter()
        .filter(|q| q.outcome == split.side && q.line.is_some())
        .collect();
    if public.len() < 2 {
        return None;
    }
    let first = public.first()?.line?;
    let last = public.last()?.line?;

    // Public money ordinarily pushes the public side's number worse. The
    // number improving for its backers instead means the books are shading
    // toward sharp money on the other side.
    let delta = last - first;
    if delta < cfg::RLM_MIN_MOVEMENT {
        return None;
    }
    let magnitude = delta;

    let strength = if magnitude >= cfg::RLM_STRONG_MOVE {
        Strength::Strong
    } else if magnitude >= cfg::RLM_MODERATE_MOVE {
        Strength::Moderate
    } else {
        Strength::Weak
    };

    let sharp_side = quotes
        .iter()
        .map(|q| q.outcome.as_str())
        .find(|o| *o != split.side)
        .unwrap_or("opposite")
        .to_string();

    Some(SignalDraft {
        signal_type: SignalKind::ReverseLineMovement,
        strength,
        confidence: (50.0 + magnitude * 20.0).min(100.0),
        side: sharp_side,
        movement: magnitude,
        venue_count: distinct_venues(quotes),
    })
}

/// Steam move: three or more distinct venues updated the key inside the
/// short trailing window. Fires deterministically at exactly three.
pub fn detect_steam(recent_quotes: &[Quote]) -> Option<SignalDraft> {
    let venues = distinct_venues(recent_quotes) as usize;
    if venues < cfg::STEAM_MIN_VENUES {
        return None;
    }
    let strength = if venues >= cfg::STEAM_VERY_STRONG_VENUES {
        Strength::VeryStrong
    } else if venues >= cfg::STEAM_STRONG_VENUES {
        Strength::Strong
    } else {
        Strength::Moderate
    };

    let mean = mean_line(recent_quotes);
    Some(SignalDraft {
        signal_type: SignalKind::SteamMove,
        strength,
        confidence: (venues as f64 * 20.0).min(100.0),
        side: side_from_mean_line(mean),
        movement: mean.unwrap_or(0.0),
        venue_count: venues as u32,
    })
}

/// Sharp consensus: two or more allow-listed sharp venues quoting lines
/// within half a point of each other.
pub fn detect_sharp_consensus(quotes: &[Quote]) -> Option<SignalDraft> {
    // Latest line per sharp venue.
    let mut latest: Vec<(&str, f64)> = Vec::new();
    for q in quotes {
        if !cfg::SHARP_VENUES.contains(&q.venue.as_str()) {
            continue;
        }
        let Some(line) = q.line else { continue };
        match latest.iter_mut().find(|(v, _)| *v == q.venue) {
            // Ascending input order makes the last write the newest quote.
            Some(entry) => entry.1 = line,
            None => latest.push((q.venue.as_str(), line)),
        }
    }
    if latest.len() < cfg::CONSENSUS_MIN_VENUES {
        return None;
    }

    // Largest group of venues agreeing within the tolerance.
    let mut best: Vec<f64> = Vec::new();
    for (_, anchor) in &latest {
        let group: Vec<f64> = latest
            .iter()
            .filter(|(_, l)| (l - anchor).abs() <= cfg::CONSENSUS_LINE_TOLERANCE)
            .map(|(_, l)| *l)
            .collect();
        if group.len() > best.len() {
            best = group;
        }
    }
    if best.len() < cfg::CONSENSUS_MIN_VENUES {
        return None;
    }

    let agreeing = best.len();
    let consensus_line = best.iter().sum::<f64>() / agreeing as f64;
    let strength = if agreeing >= 4 {
        Strength::VeryStrong
    } else if agreeing >= 3 {
        Strength::Strong
    } else {
        Strength::Moderate
    };

    Some(SignalDraft {
        signal_type: SignalKind::SharpConsensus,
        strength,
        confidence: (agreeing as f64 * 25.0).min(100.0),
        side: side_from_mean_line(Some(consensus_line)),
        movement: consensus_line,
        venue_count: agreeing as u32,
    })
}

fn distinct_venues(quotes: &[Quote]) -> u32 {
    quotes
        .iter()
        .map(|q| q.venue.as_str())
        .collect::<HashSet<_>>()
        .len() as u32
}

fn mean_line(quotes: &[Quote]) -> Option<f64> {
    let lines: Vec<f64> = quotes.iter().filter_map(|q| q.line).collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.iter().sum::<f64>() / lines.len() as f64)
    }
}

/// Negative lines price the favorite; non-negative the underdog.
fn side_from_mean_line(mean: Option<f64>) -> String {
    match mean {
        Some(m) if m < 0.0 => "favorite".to_string(),
        _ => "underdog".to_string(),
    }
}
