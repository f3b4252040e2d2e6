//! Session segmentation: from a raw bar series to per-day indicator rows.

pub mod session;

pub use session::{
    DayBars, IndicatorRow, Session, SessionSegmenter, SessionWindow, Sessions, VolatilityFilter,
};
