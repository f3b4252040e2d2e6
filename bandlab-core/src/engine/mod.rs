//! Trade simulation engine.
//!
//! - `state`: position state and adverse-excursion tracking
//! - `accounting`: PnL and drawdown currency conversion
//! - `machine`: the per-row transition function and the session loop

pub mod accounting;
pub mod machine;
pub mod state;

pub use machine::{EngineConfig, EngineError, TradeStateMachine, Transition};
pub use state::{AdverseExcursion, OpenPosition, PositionState};
