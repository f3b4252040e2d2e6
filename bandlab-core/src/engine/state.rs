//! Position state carried between rows of a single session.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::Direction;

/// Worst price seen against an open position, with its deviation from entry.
///
/// Starts undefined. Once set, the tracked price only moves against the
/// position: lower for longs, higher for shorts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdverseExcursion {
    worst: Option<Excursion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Excursion {
    price: f64,
    pct: f64,
}

impl AdverseExcursion {
    pub fn undefined() -> Self {
        Self::default()
    }

    pub fn price(&self) -> Option<f64> {
        self.worst.map(|e| e.price)
    }

    pub fn pct(&self) -> Option<f64> {
        self.worst.map(|e| e.pct)
    }

    pub fn is_defined(&self) -> bool {
        self.worst.is_some()
    }

    /// Fold in the row's candidate price for an open position.
    ///
    /// Long: candidate is the row low, pct = |entry / low - 1|.
    /// Short: candidate is the row high, pct = |high / entry - 1|.
    pub fn observe(self, direction: Direction, entry_price: f64, candidate: f64) -> Self {
        let worse = match (direction, self.worst) {
            (_, None) => true,
            (Direction::Long, Some(w)) => candidate < w.price,
            (Direction::Short, Some(w)) => candidate > w.price,
        };
        if !worse {
            return self;
        }

        let pct = match direction {
            Direction::Long => (entry_price / candidate - 1.0).abs(),
            Direction::Short => (candidate / entry_price - 1.0).abs(),
        };
        Self {
            worst: Some(Excursion {
                price: candidate,
                pct,
            }),
        }
    }
}

/// An open position within a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub excursion: AdverseExcursion,
}

/// Per-session position state: flat, or exactly one open position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            PositionState::Flat => None,
            PositionState::Open(p) => Some(p.direction),
        }
    }
}
