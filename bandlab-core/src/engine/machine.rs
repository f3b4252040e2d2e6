//! Trade state machine.
//!
//! One call to [`TradeStateMachine::step`] advances a session by one row:
//!
//! ```text
//! FLAT  --close > mid (+gate)-->  LONG   --high >= upper-->  FLAT (trade)
//! FLAT  --close < mid (+gate)-->  SHORT  --low  <= lower-->  FLAT (trade)
//! ```
//!
//! Entries use strict inequalities, exits inclusive ones. The entry row is
//! never tested for an exit. Whatever is still open after the session's last
//! row is dropped, not force-closed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::accounting::{drawdown_cost, fee_cost, realized_pnl};
use super::state::{AdverseExcursion, OpenPosition, PositionState};
use crate::data::session::IndicatorRow;
use crate::domain::{Direction, TradeRecord};
use chrono::NaiveDateTime;

/// Errors raised by the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("degenerate entry price {price} at {time}")]
    DegeneratePrice { time: NaiveDateTime, price: f64 },

    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}

/// Cost and gating parameters for the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Notional capital allocated to every trade (R).
    pub capital_per_trade: f64,
    /// Round-trip fee as a fraction of capital (f).
    pub fee_fraction: f64,
    /// Require elevated volatility on entry rows.
    pub volatility_gate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capital_per_trade: 10_000.0,
            fee_fraction: 0.0003,
            volatility_gate: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.capital_per_trade.is_finite() && self.capital_per_trade > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "capital_per_trade must be > 0, got {}",
                self.capital_per_trade
            )));
        }
        if !(self.fee_fraction.is_finite() && self.fee_fraction >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "fee_fraction must be >= 0, got {}",
                self.fee_fraction
            )));
        }
        Ok(())
    }
}

/// Outcome of a single row.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// No trade completed; carry this state into the next row.
    Holding(PositionState),
    /// A position closed on this row. `state` is the state after the close.
    Closed {
        state: PositionState,
        trade: TradeRecord,
    },
}

impl Transition {
    pub fn state(&self) -> PositionState {
        match self {
            Transition::Holding(state) => *state,
            Transition::Closed { state, .. } => *state,
        }
    }
}

/// Per-session mean-reversion state machine.
#[derive(Debug, Clone)]
pub struct TradeStateMachine {
    config: EngineConfig,
}

impl TradeStateMachine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Advance one row.
    pub fn step(&self, state: PositionState, row: &IndicatorRow) -> Result<Transition, EngineError> {
        match state {
            PositionState::Flat => self.try_enter(row).map(Transition::Holding),
            PositionState::Open(position) => Ok(self.manage(position, row)),
        }
    }

    /// Run a whole session from flat and return the completed trades.
    pub fn run_session(&self, rows: &[IndicatorRow]) -> Result<Vec<TradeRecord>, EngineError> {
        let mut state = PositionState::Flat;
        let mut trades = Vec::new();

        for row in rows {
            state = match self.step(state, row)? {
                Transition::Holding(next) => next,
                Transition::Closed { state, trade } => {
                    trades.push(trade);
                    state
                }
            };
        }

        if let PositionState::Open(open) = state {
            log::trace!(
                "discarding open {} position from {} at session end",
                open.direction,
                open.entry_time
            );
        }

        Ok(trades)
    }

    fn gate_open(&self, row: &IndicatorRow) -> bool {
        if !self.config.volatility_gate {
            return true;
        }
        row.volatility.is_some_and(|v| v.is_elevated())
    }

    fn try_enter(&self, row: &IndicatorRow) -> Result<PositionState, EngineError> {
        let close = row.bar.close;
        let direction = if close > row.bands.middle {
            Direction::Long
        } else if close < row.bands.middle {
            Direction::Short
        } else {
            return Ok(PositionState::Flat);
        };

        if !self.gate_open(row) {
            return Ok(PositionState::Flat);
        }

        if close == 0.0 || !close.is_finite() {
            return Err(EngineError::DegeneratePrice {
                time: row.timestamp(),
                price: close,
            });
        }

        Ok(PositionState::Open(OpenPosition {
            direction,
            entry_price: close,
            entry_time: row.timestamp(),
            excursion: AdverseExcursion::undefined(),
        }))
    }

    fn manage(&self, position: OpenPosition, row: &IndicatorRow) -> Transition {
        let bar = &row.bar;
        let (exit_hit, exit_price, candidate) = match position.direction {
            Direction::Long => (bar.high >= row.bands.upper, bar.high, bar.low),
            Direction::Short => (bar.low <= row.bands.lower, bar.low, bar.high),
        };

        if exit_hit {
            return Transition::Closed {
                state: PositionState::Flat,
                trade: self.close(&position, row.timestamp(), exit_price),
            };
        }

        Transition::Holding(PositionState::Open(OpenPosition {
            excursion: position
                .excursion
                .observe(position.direction, position.entry_price, candidate),
            ..position
        }))
    }

    fn close(&self, position: &OpenPosition, exit_time: NaiveDateTime, exit_price: f64) -> TradeRecord {
        let EngineConfig {
            capital_per_trade: capital,
            fee_fraction,
            ..
        } = self.config;

        let trade = TradeRecord {
            session: position.entry_time.date(),
            direction: position.direction,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_time,
            exit_price,
            duration_minutes: (exit_time - position.entry_time).num_minutes(),
            pnl: realized_pnl(
                position.direction,
                position.entry_price,
                exit_price,
                capital,
                fee_fraction,
            ),
            fee: fee_cost(capital, fee_fraction),
            adverse_price: position.excursion.price(),
            adverse_pct: position.excursion.pct(),
            drawdown: drawdown_cost(position.excursion.pct(), capital, fee_fraction),
        };
        log::trace!(
            "closed {} {} -> {} pnl={:.2}",
            trade.direction,
            trade.entry_time,
            trade.exit_time,
            trade.pnl
        );
        trade
    }
}
