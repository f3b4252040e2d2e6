//! Capability seams between the engine and the statistics it consumes.

pub mod indicator;

pub use indicator::{BandProvider, ChannelBands, ChannelSeries, VolatilityProvider, VolatilityReading};
