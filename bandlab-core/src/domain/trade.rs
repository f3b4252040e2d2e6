//! TradeRecord — a completed round-trip trade within one session.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of an open position. Flat is modelled by the absence of a position,
/// so only the two reachable sides exist here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete round-trip trade record: entry → exit, same session.
///
/// Created exactly once by the trade state machine when a position closes
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Identification ──
    pub session: NaiveDate,
    pub direction: Direction,

    // ── Entry ──
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,

    // ── Duration ──
    pub duration_minutes: i64,

    // ── PnL ──
    /// Realized PnL in currency units, net of the round-trip fee.
    pub pnl: f64,
    /// Round-trip fee cost (`capital * fee_fraction`).
    pub fee: f64,

    // ── Excursion ──
    /// Worst price seen while the position was open (None if the position
    /// closed on the row right after entry).
    pub adverse_price: Option<f64>,
    /// Deviation of `adverse_price` from the entry price as a fraction.
    pub adverse_pct: Option<f64>,
    /// Maximum adverse excursion in currency units, fee included.
    pub drawdown: Option<f64>,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// PnL before the round-trip fee was charged.
    pub fn gross_pnl(&self) -> f64 {
        self.pnl + self.fee
    }
}
