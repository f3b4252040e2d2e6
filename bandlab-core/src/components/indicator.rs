//! Indicator capability traits and the per-row values they produce.
//!
//! Providers are pure functions: price history in, aligned numeric series out.
//! They are computed once per session before the row loop, never per row.
//! Leading warm-up entries are `f64::NAN`.
//!
//! # Look-ahead contamination guard
//! No output at index t may depend on input at index t+1 or later.

use serde::{Deserialize, Serialize};

/// Three aligned series describing a banded channel around a moving mean.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSeries {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl ChannelSeries {
    /// Channel values at `index`, or `None` if any band is undefined there.
    pub fn at(&self, index: usize) -> Option<ChannelBands> {
        let bands = ChannelBands {
            upper: *self.upper.get(index)?,
            middle: *self.middle.get(index)?,
            lower: *self.lower.get(index)?,
        };
        bands.is_defined().then_some(bands)
    }
}

/// Channel bounds for a single timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl ChannelBands {
    pub fn is_defined(&self) -> bool {
        self.upper.is_finite() && self.middle.is_finite() && self.lower.is_finite()
    }
}

/// Volatility measure and its own rolling threshold for a single timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReading {
    pub value: f64,
    pub threshold: f64,
}

impl VolatilityReading {
    pub fn is_defined(&self) -> bool {
        self.value.is_finite() && self.threshold.is_finite()
    }

    /// Entry gate: volatility strictly above its threshold.
    pub fn is_elevated(&self) -> bool {
        self.is_defined() && self.value > self.threshold
    }
}

/// Produces the banded channel for a session's closes.
///
/// Output series have the same length as `closes`.
pub trait BandProvider: Send + Sync {
    /// Human-readable name (e.g., "bollinger_26_2.2").
    fn name(&self) -> &str;

    /// Number of leading entries that are undefined.
    fn lookback(&self) -> usize;

    fn compute_bands(&self, closes: &[f64]) -> ChannelSeries;
}

/// Produces a volatility measure from a session's highs, lows and closes.
///
/// Output has the same length as the inputs.
pub trait VolatilityProvider: Send + Sync {
    fn name(&self) -> &str;

    fn lookback(&self) -> usize;

    fn compute_volatility(&self, highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64>;
}
