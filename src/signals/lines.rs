//! Opening/closing line tracking per (event, market) key.

use serde::Serialize;

use crate::odds;
use crate::types::{LineDirection, Quote};

#[derive(Debug, Clone, Serialize)]
pub struct LineTrack {
    pub opening_line: Option<f64>,
    pub opening_odds: i32,
    pub opened_at: i64,
    pub closing_line: Option<f64>,
    pub closing_odds: i32,
    pub closed_at: i64,
    pub movement: f64,
    pub direction: LineDirection,
}

/// Build the opening/closing pair from a key's quote history, sorted
/// ascending by observation time. The first quote is the opener, the latest
/// the current closer; callers re-run this as new quotes arrive and stop
/// once the event commences.
pub fn track(quotes: &[Quote]) -> Option<LineTrack> {
    let first = quotes.first()?;
    let last = quotes.last()?;

    // Point movement when the market carries a line; implied-probability
    // points (x100) for moneyline keys.
    let movement = match (first.line, last.line) {
        (Some(a), Some(b)) => b - a,
        _ => {
            // Rising implied probability means the price shortened toward
            // the favorite, which reads as negative movement like a
            // shrinking spread does.
            let pa = odds::implied_probability(first.american_odds).unwrap_or(0.5);
            let pb = odds::implied_probability(last.american_odds).unwrap_or(0.5);
            (pa - pb) * 100.0
        }
    };

    let direction = if movement < 0.0 {
        LineDirection::TowardFavorite
    } else if movement > 0.0 {
        LineDirection::TowardUnderdog
    } else {
        LineDirection::Unchanged
    };

    Some(LineTrack {
        opening_line: first.line,
        opening_odds: first.american_odds,
        opened_at: first.observed_at,
        closing_line: last.line,
        closing_odds: last.american_odds,
        closed_at: last.observed_at,
        movement,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketKind;

    fn quote(odds: i32, line: Option<f64>, observed_at: i64) -> Quote {
        Quote {
            venue: "venue_a".to_string(),
            event_id: "evt1".to_string(),
            market: MarketKind::Spread,
            outcome: "home".to_string(),
            american_odds: odds,
            line,
            observed_at,
        }
    }

    const T0: i64 = 1_700_000_000;

    #[test]
    fn compares_earliest_and_latest_only() {
        let quotes = vec![
            quote(-110, Some(-3.0), T0),
            quote(-110, Some(-7.0), T0 + 60), // transient spike, ignored
            quote(-110, Some(-4.5), T0 + 120),
        ];
        let t = track(&quotes).unwrap();
        assert_eq!(t.opening_line, Some(-3.0));
        assert_eq!(t.closing_line, Some(-4.5));
        assert_eq!(t.movement, -1.5);
        assert_eq!(t.direction, LineDirection::TowardFavorite);
        assert_eq!(t.opened_at, T0);
        assert_eq!(t.closed_at, T0 + 120);
    }

    #[test]
    fn moneyline_uses_implied_probability_points() {
        let quotes = vec![quote(100, None, T0), quote(-120, None, T0 + 60)];
        let t = track(&quotes).unwrap();
        // 50% → 54.5%: about 4.5 probability points toward the favorite.
        assert!(t.movement < -4.0 && t.movement > -5.0);
        assert_eq!(t.direction, LineDirection::TowardFavorite);
    }

    #[test]
    fn unchanged_line() {
        let quotes = vec![quote(-110, Some(-3.0), T0), quote(-110, Some(-3.0), T0 + 60)];
        let t = track(&quotes).unwrap();
        assert_eq!(t.movement, 0.0);
        assert_eq!(t.direction, LineDirection::Unchanged);
    }

    #[test]
    fn empty_history_yields_nothing() {
        assert!(track(&[]).is_none());
    }
}
