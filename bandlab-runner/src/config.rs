//! Serializable backtest configuration (TOML).
//!
//! Every field has a default, so an empty file is a valid config:
//!
//! ```toml
//! [data]
//! path = "NQ_OHLC_1m.csv"
//! max_rows = 500000
//!
//! [session]
//! start = "08:00"
//! end = "15:59"
//! min_bars = 479
//!
//! [bands]
//! length = 26
//! std_dev = 2.2
//!
//! [volatility]        # optional: omit to trade without the volatility gate
//! length = 14
//! threshold_window = 30
//!
//! [costs]
//! capital_per_trade = 10000.0
//! fee_fraction = 0.0003
//!
//! [run]
//! parallel = true
//! ```

use std::path::{Path, PathBuf};

use bandlab_core::data::SessionWindow;
use bandlab_core::engine::EngineConfig;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete, reproducible description of one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataConfig,
    pub session: SessionConfig,
    pub bands: BandConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility: Option<VolatilityConfig>,
    pub costs: CostConfig,
    pub run: RunOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV of OHLC bars, timestamp in the first column.
    pub path: PathBuf,
    /// Read at most this many rows from the top of the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("NQ_OHLC_1m.csv"),
            max_rows: Some(500_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inclusive window start, "HH:MM" or "HH:MM:SS".
    pub start: String,
    /// Inclusive window end.
    pub end: String,
    /// Sessions with fewer complete bars are skipped.
    pub min_bars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start: "08:00".into(),
            end: "15:59".into(),
            min_bars: 479,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    pub length: usize,
    pub std_dev: f64,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            length: 26,
            std_dev: 2.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    /// ATR period.
    pub length: usize,
    /// Rolling-mean window of the ATR used as the entry threshold.
    pub threshold_window: usize,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            length: 14,
            threshold_window: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub capital_per_trade: f64,
    pub fee_fraction: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            capital_per_trade: engine.capital_per_trade,
            fee_fraction: engine.fee_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Simulate sessions on the rayon pool. Ledger order is unaffected.
    pub parallel: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl BacktestConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bands.length == 0 {
            return Err(ConfigError::Invalid("bands.length must be > 0".into()));
        }
        if !(self.bands.std_dev.is_finite() && self.bands.std_dev > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bands.std_dev must be > 0, got {}",
                self.bands.std_dev
            )));
        }
        if let Some(vol) = &self.volatility {
            if vol.length == 0 || vol.threshold_window == 0 {
                return Err(ConfigError::Invalid(
                    "volatility.length and volatility.threshold_window must be > 0".into(),
                ));
            }
        }
        if self.data.max_rows == Some(0) {
            return Err(ConfigError::Invalid("data.max_rows must be > 0".into()));
        }
        let window = self.session_window()?;
        if window.start > window.end {
            return Err(ConfigError::Invalid(format!(
                "session.start {} is after session.end {}",
                self.session.start, self.session.end
            )));
        }
        self.engine_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn session_window(&self) -> Result<SessionWindow, ConfigError> {
        Ok(SessionWindow::new(
            parse_time_of_day(&self.session.start)?,
            parse_time_of_day(&self.session.end)?,
        ))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            capital_per_trade: self.costs.capital_per_trade,
            fee_fraction: self.costs.fee_fraction,
            volatility_gate: self.volatility.is_some(),
        }
    }

    /// Deterministic content hash of the config.
    ///
    /// Two runs with identical configs over the same dataset share a run id.
    pub fn run_id(&self) -> String {
        // Plain structs and strings only: serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

fn parse_time_of_day(s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| ConfigError::Invalid(format!("bad time of day '{s}', expected HH:MM")))
}
