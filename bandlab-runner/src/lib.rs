//! BandLab Runner — backtest orchestration, evaluation and export.
//!
//! This crate builds on `bandlab-core` to provide:
//! - TOML configuration with validation and run fingerprinting
//! - CSV bar loading with a synthetic fallback for development
//! - The session runner (sequential or rayon-parallel)
//! - Trade-log evaluation
//! - JSON / CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
pub use metrics::Evaluation;
pub use runner::{
    run_backtest_from_bars, run_backtest_from_loaded, run_single_backtest, BacktestResult,
    RunError,
};
