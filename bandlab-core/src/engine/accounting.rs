//! Trade accounting: capital-constant position sizing.
//!
//! Each trade is sized so that `entry_price * quantity == capital`, so a price
//! delta converts to currency as `delta * capital / entry_price`.

use crate::domain::Direction;

/// Round-trip fee in currency units.
pub fn fee_cost(capital: f64, fee_fraction: f64) -> f64 {
    capital * fee_fraction
}

/// Realized PnL net of the round-trip fee.
pub fn realized_pnl(
    direction: Direction,
    entry_price: f64,
    exit_price: f64,
    capital: f64,
    fee_fraction: f64,
) -> f64 {
    let delta = match direction {
        Direction::Long => exit_price - entry_price,
        Direction::Short => entry_price - exit_price,
    };
    delta * (capital / entry_price) - fee_cost(capital, fee_fraction)
}

/// Adverse excursion in currency units, fee included.
///
/// Undefined when no excursion was ever recorded.
pub fn drawdown_cost(adverse_pct: Option<f64>, capital: f64, fee_fraction: f64) -> Option<f64> {
    adverse_pct.map(|pct| pct * capital + fee_cost(capital, fee_fraction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_pnl_matches_reference_example() {
        let pnl = realized_pnl(Direction::Long, 100.0, 110.0, 10_000.0, 0.0003);
        assert!((pnl - 997.0).abs() < 1e-9);
    }

    #[test]
    fn short_pnl_is_mirrored() {
        let pnl = realized_pnl(Direction::Short, 100.0, 90.0, 10_000.0, 0.0003);
        assert!((pnl - 997.0).abs() < 1e-9);

        let loss = realized_pnl(Direction::Short, 100.0, 105.0, 10_000.0, 0.0003);
        assert!((loss - (-503.0)).abs() < 1e-9);
    }

    #[test]
    fn drawdown_includes_fee() {
        let dd = drawdown_cost(Some(0.02), 10_000.0, 0.0003).unwrap();
        assert!((dd - 203.0).abs() < 1e-9);
        assert_eq!(drawdown_cost(None, 10_000.0, 0.0003), None);
    }
}
