//! Trade-log evaluation — pure functions that reduce a ledger to statistics.
//!
//! Every metric is a pure function: trade list in, scalar out. Nothing here
//! mutates the ledger or depends on the runner or data pipeline.

use bandlab_core::domain::{TradeLedger, TradeRecord};
use serde::{Deserialize, Serialize};

/// Aggregate statistics for a single backtest run.
///
/// Means are `None` when there is nothing to average over (empty ledger, or
/// no trade with a defined drawdown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub trade_count: usize,
    pub total_pnl: f64,
    pub avg_pnl: Option<f64>,
    pub avg_drawdown: Option<f64>,
    pub avg_duration_minutes: Option<f64>,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub worst_drawdown: Option<f64>,
    pub max_consecutive_losses: usize,
}

impl Evaluation {
    pub fn compute(ledger: &TradeLedger) -> Self {
        let trades = ledger.as_slice();
        Self {
            trade_count: trades.len(),
            total_pnl: total_pnl(trades),
            avg_pnl: mean_pnl(trades),
            avg_drawdown: mean_drawdown(trades),
            avg_duration_minutes: mean_duration(trades),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            worst_drawdown: worst_drawdown(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Sum of realized PnL, net of fees.
pub fn total_pnl(trades: &[TradeRecord]) -> f64 {
    trades.iter().map(|t| t.pnl).sum()
}

/// Mean realized PnL per trade.
pub fn mean_pnl(trades: &[TradeRecord]) -> Option<f64> {
    mean(trades.iter().map(|t| t.pnl))
}

/// Mean drawdown over trades whose drawdown is defined. Trades that closed
/// before any adverse observation are excluded from numerator and
/// denominator alike.
pub fn mean_drawdown(trades: &[TradeRecord]) -> Option<f64> {
    mean(trades.iter().filter_map(|t| t.drawdown))
}

/// Mean holding time in minutes.
pub fn mean_duration(trades: &[TradeRecord]) -> Option<f64> {
    mean(trades.iter().map(|t| t.duration_minutes as f64))
}

/// Fraction of trades with positive PnL.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Largest single-trade drawdown in currency units.
pub fn worst_drawdown(trades: &[TradeRecord]) -> Option<f64> {
    trades
        .iter()
        .filter_map(|t| t.drawdown)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))))
}

/// Longest run of consecutive non-winning trades.
pub fn max_consecutive_losses(trades: &[TradeRecord]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for t in trades {
        if t.is_winner() {
            current = 0;
        } else {
            current += 1;
            max_streak = max_streak.max(current);
        }
    }
    max_streak
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
