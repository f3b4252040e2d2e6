//! Backtest runner — wires together loading, segmentation, the trade
//! state machine and evaluation.
//!
//! Two entry points:
//! - `run_single_backtest()`: loads bars from the configured CSV, then runs. Used by CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars. Used by tests and benchmarks.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bandlab_core::data::{SessionSegmenter, VolatilityFilter};
use bandlab_core::domain::{Bar, TradeLedger, TradeRecord};
use bandlab_core::engine::{EngineError, TradeStateMachine};
use bandlab_core::indicators::{Atr, Bollinger};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
use crate::metrics::Evaluation;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub evaluation: Evaluation,
    pub trades: TradeLedger,
    pub config: BacktestConfig,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub bar_count: usize,
    /// Sessions that reached the state machine.
    pub session_count: usize,
    /// Days dropped for having too few complete bars.
    pub skipped_sessions: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a single backtest from a BacktestConfig (loads data from the CSV).
pub fn run_single_backtest(
    config: &BacktestConfig,
    opts: &LoadOptions,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let opts = LoadOptions {
        max_rows: opts.max_rows.or(config.data.max_rows),
        ..opts.clone()
    };
    let loaded = load_bars(&config.data.path, &opts)?;
    run_backtest_from_loaded(config, &loaded)
}

/// Run a backtest over already-loaded data, keeping its provenance.
pub fn run_backtest_from_loaded(
    config: &BacktestConfig,
    loaded: &LoadedData,
) -> Result<BacktestResult, RunError> {
    run_backtest_from_bars(
        config,
        &loaded.bars,
        &loaded.dataset_hash,
        loaded.has_synthetic(),
    )
}

/// Run a backtest with pre-loaded bars — no I/O.
///
/// `bars` must be sorted ascending by timestamp with unique timestamps, as
/// produced by the data loader.
pub fn run_backtest_from_bars(
    config: &BacktestConfig,
    bars: &[Bar],
    dataset_hash: &str,
    has_synthetic: bool,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let segmenter = build_segmenter(config)?;
    let machine = TradeStateMachine::new(config.engine_config())?;

    let outcome = if config.run.parallel {
        simulate_parallel(&segmenter, &machine, bars)?
    } else {
        simulate_sequential(&segmenter, &machine, bars)?
    };

    let mut trades = TradeLedger::new();
    for session_trades in outcome.per_session {
        trades.extend(session_trades);
    }
    let evaluation = Evaluation::compute(&trades);

    log::info!(
        "{} sessions simulated ({} skipped), {} trades, total PnL {:.2}",
        outcome.session_count,
        outcome.skipped,
        evaluation.trade_count,
        evaluation.total_pnl
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        evaluation,
        trades,
        config: config.clone(),
        dataset_hash: dataset_hash.to_string(),
        has_synthetic,
        bar_count: bars.len(),
        session_count: outcome.session_count,
        skipped_sessions: outcome.skipped,
    })
}

/// Build the session segmenter described by the config.
pub fn build_segmenter(config: &BacktestConfig) -> Result<SessionSegmenter, ConfigError> {
    let bands = Bollinger::new(config.bands.length, config.bands.std_dev);
    let mut segmenter = SessionSegmenter::new(
        config.session_window()?,
        config.session.min_bars,
        Box::new(bands),
    );
    if let Some(vol) = &config.volatility {
        segmenter = segmenter.with_volatility(VolatilityFilter::new(
            Box::new(Atr::new(vol.length)),
            vol.threshold_window,
        ));
    }
    Ok(segmenter)
}

/// Trades grouped by session, in session-date order.
struct SimulationOutcome {
    per_session: Vec<Vec<TradeRecord>>,
    session_count: usize,
    skipped: usize,
}

fn simulate_sequential(
    segmenter: &SessionSegmenter,
    machine: &TradeStateMachine,
    bars: &[Bar],
) -> Result<SimulationOutcome, EngineError> {
    let mut sessions = segmenter.sessions(bars);
    let mut per_session = Vec::new();
    for session in sessions.by_ref() {
        per_session.push(machine.run_session(&session.rows)?);
    }
    Ok(SimulationOutcome {
        session_count: per_session.len(),
        skipped: sessions.skipped(),
        per_session,
    })
}

fn simulate_parallel(
    segmenter: &SessionSegmenter,
    machine: &TradeStateMachine,
    bars: &[Bar],
) -> Result<SimulationOutcome, EngineError> {
    let days = segmenter.split_days(bars);
    let total_days = days.len();

    // Indexed collect keeps date order; skipped days come back as None.
    let results: Vec<Option<Vec<TradeRecord>>> = days
        .par_iter()
        .map(|day| {
            segmenter
                .build(day)
                .map(|session| machine.run_session(&session.rows))
                .transpose()
        })
        .collect::<Result<_, _>>()?;

    let per_session: Vec<Vec<TradeRecord>> = results.into_iter().flatten().collect();
    Ok(SimulationOutcome {
        session_count: per_session.len(),
        skipped: total_days - per_session.len(),
        per_session,
    })
}
