//! American-odds conversions. Pure functions; every other module that touches
//! a price goes through these.

use crate::error::{AppError, Result};

/// Implied win probability for an American price.
///
/// Positive odds: `100 / (odds + 100)`. Negative: `|odds| / (|odds| + 100)`.
/// Zero is undefined in American notation and rejected.
pub fn implied_probability(american: i32) -> Result<f64> {
    if american == 0 {
        return Err(AppError::validation("american odds of 0 are undefined"));
    }
    let odds = f64::from(american);
    if american > 0 {
        Ok(100.0 / (odds + 100.0))
    } else {
        Ok(odds.abs() / (odds.abs() + 100.0))
    }
}

/// Decimal payout multiplier per unit staked.
///
/// Positive odds: `1 + odds/100`. Negative: `1 + 100/|odds|`.
pub fn decimal_odds(american: i32) -> Result<f64> {
    if american == 0 {
        return Err(AppError::validation("american odds of 0 are undefined"));
    }
    let odds = f64::from(american);
    if american > 0 {
        Ok(1.0 + odds / 100.0)
    } else {
        Ok(1.0 + 100.0 / odds.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn rejects_zero_odds() {
        assert!(implied_probability(0).is_err());
        assert!(decimal_odds(0).is_err());
    }

    #[test]
    fn positive_odds_probability() {
        close(implied_probability(100).unwrap(), 0.5);
        close(implied_probability(150).unwrap(), 0.4);
        close(implied_probability(300).unwrap(), 0.25);
    }

    #[test]
    fn negative_odds_probability() {
        close(implied_probability(-100).unwrap(), 0.5);
        close(implied_probability(-150).unwrap(), 0.6);
        close(implied_probability(-300).unwrap(), 0.75);
    }

    #[test]
    fn decimal_conversions() {
        close(decimal_odds(150).unwrap(), 2.5);
        close(decimal_odds(120).unwrap(), 2.2);
        close(decimal_odds(-200).unwrap(), 1.5);
        close(decimal_odds(100).unwrap(), 2.0);
        close(decimal_odds(-100).unwrap(), 2.0);
    }

    #[test]
    fn probability_always_in_open_interval() {
        for odds in [-100_000, -5000, -110, -100, 100, 110, 5000, 100_000] {
            let p = implied_probability(odds).unwrap();
            assert!(p > 0.0 && p < 1.0, "p({odds}) = {p}");
        }
    }

    #[test]
    fn symmetric_pair_sums_to_one() {
        // p(+O) = 1 - p(-O) for the even-money-adjacent pair.
        let plus = implied_probability(110).unwrap();
        let minus = implied_probability(-110).unwrap();
        close(plus + minus, 1.0);
    }
}
