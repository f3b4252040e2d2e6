//! Domain types for BandLab

pub mod bar;
pub mod ledger;
pub mod trade;

pub use bar::Bar;
pub use ledger::TradeLedger;
pub use trade::{Direction, TradeRecord};
