//! BandLab Core — bars, band indicators, session segmentation, trade engine.
//!
//! This crate contains the heart of the intraday band backtester:
//! - Domain types (bars, trade records, the trade ledger)
//! - Indicator capability traits and the Bollinger / ATR implementations
//! - Session segmenter (per-day windows, per-day indicators, inner join)
//! - Trade state machine with adverse-excursion tracking

pub mod components;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across rayon workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();
        require_send::<domain::TradeLedger>();
        require_sync::<domain::TradeLedger>();

        require_send::<data::Session>();
        require_sync::<data::Session>();
        require_send::<data::SessionSegmenter>();
        require_sync::<data::SessionSegmenter>();

        require_send::<engine::TradeStateMachine>();
        require_sync::<engine::TradeStateMachine>();
        require_send::<engine::PositionState>();
        require_sync::<engine::PositionState>();
    }

    /// Architecture contract: providers only see price slices.
    ///
    /// Band and volatility providers take plain `&[f64]` inputs, so they cannot
    /// observe position state or rows outside the session they are given.
    #[test]
    fn providers_take_only_price_slices() {
        fn _check_band(p: &dyn components::BandProvider, closes: &[f64]) -> components::ChannelSeries {
            p.compute_bands(closes)
        }
        fn _check_vol(p: &dyn components::VolatilityProvider, h: &[f64], l: &[f64], c: &[f64]) -> Vec<f64> {
            p.compute_volatility(h, l, c)
        }
    }
}
