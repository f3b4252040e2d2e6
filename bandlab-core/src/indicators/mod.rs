//! Concrete indicator implementations.
//!
//! - `Bollinger` implements `BandProvider` (the banded channel).
//! - `Atr` implements `VolatilityProvider` (the volatility measure).
//! - `rolling_mean` derives the volatility threshold from the measure.
//!
//! All are computed per session; nothing carries over between days.

pub mod atr;
pub mod bollinger;
pub mod sma;

pub use atr::Atr;
pub use bollinger::Bollinger;
pub use sma::rolling_mean;

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
