//! BandLab CLI — run band mean-reversion backtests over intraday CSV bars.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file, with flag overrides
//! - `init-config` — write the default config as TOML
//! - `show` — print the summary of a saved run

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bandlab_runner::config::VolatilityConfig;
use bandlab_runner::export::{load_artifacts, render_summary, save_artifacts};
use bandlab_runner::{run_single_backtest, BacktestConfig, LoadOptions};

#[derive(Parser)]
#[command(
    name = "bandlab",
    about = "BandLab CLI — intraday Bollinger-band mean-reversion backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest. Flags override values from the config file.
    Run {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Generate synthetic bars when the data file does not exist.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip writing artifacts; print the summary only.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Write the default configuration as TOML.
    InitConfig {
        /// Destination file.
        #[arg(default_value = "bandlab.toml")]
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Print the summary of a saved run directory.
    Show {
        /// Artifact directory created by `run`.
        run_dir: PathBuf,
    },
}

#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// CSV of OHLC bars (timestamp in the first column).
    #[arg(long)]
    data: Option<PathBuf>,

    /// Read at most this many rows from the data file.
    #[arg(long)]
    max_rows: Option<usize>,

    /// Session window start (HH:MM).
    #[arg(long)]
    start: Option<String>,

    /// Session window end (HH:MM), inclusive.
    #[arg(long)]
    end: Option<String>,

    /// Minimum complete bars for a session to be simulated.
    #[arg(long)]
    min_bars: Option<usize>,

    /// Bollinger band length.
    #[arg(long)]
    bb_length: Option<usize>,

    /// Bollinger band standard-deviation multiplier.
    #[arg(long)]
    bb_std: Option<f64>,

    /// Enable the ATR volatility gate with this ATR length.
    #[arg(long)]
    atr_length: Option<usize>,

    /// Rolling window of the ATR threshold (implies the volatility gate).
    #[arg(long)]
    atr_threshold_window: Option<usize>,

    /// Capital committed per trade.
    #[arg(long)]
    capital: Option<f64>,

    /// Round-trip fee as a fraction of capital.
    #[arg(long)]
    fee: Option<f64>,

    /// Simulate sessions sequentially.
    #[arg(long, default_value_t = false)]
    no_parallel: bool,
}

impl Overrides {
    fn apply(self, config: &mut BacktestConfig) {
        if let Some(path) = self.data {
            config.data.path = path;
        }
        if self.max_rows.is_some() {
            config.data.max_rows = self.max_rows;
        }
        if let Some(start) = self.start {
            config.session.start = start;
        }
        if let Some(end) = self.end {
            config.session.end = end;
        }
        if let Some(min_bars) = self.min_bars {
            config.session.min_bars = min_bars;
        }
        if let Some(length) = self.bb_length {
            config.bands.length = length;
        }
        if let Some(std_dev) = self.bb_std {
            config.bands.std_dev = std_dev;
        }
        if self.atr_length.is_some() || self.atr_threshold_window.is_some() {
            let vol = config.volatility.get_or_insert_with(VolatilityConfig::default);
            if let Some(length) = self.atr_length {
                vol.length = length;
            }
            if let Some(window) = self.atr_threshold_window {
                vol.threshold_window = window;
            }
        }
        if let Some(capital) = self.capital {
            config.costs.capital_per_trade = capital;
        }
        if let Some(fee) = self.fee {
            config.costs.fee_fraction = fee;
        }
        if self.no_parallel {
            config.run.parallel = false;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            overrides,
            synthetic,
            output_dir,
            no_save,
        } => run_backtest_cmd(config, overrides, synthetic, output_dir, no_save),
        Commands::InitConfig { path, force } => init_config(path, force),
        Commands::Show { run_dir } => {
            let result = load_artifacts(&run_dir)?;
            println!("{}", render_summary(&result));
            Ok(())
        }
    }
}

fn run_backtest_cmd(
    config_path: Option<PathBuf>,
    overrides: Overrides,
    synthetic: bool,
    output_dir: PathBuf,
    no_save: bool,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => BacktestConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;

    if !synthetic && !config.data.path.exists() {
        bail!(
            "data file {} does not exist (pass --data, or --synthetic for generated bars)",
            config.data.path.display()
        );
    }

    log::info!(
        "running bands({}, {}) over {}",
        config.bands.length,
        config.bands.std_dev,
        config.data.path.display()
    );
    let opts = LoadOptions {
        synthetic,
        ..LoadOptions::default()
    };
    let result = run_single_backtest(&config, &opts).context("backtest failed")?;

    println!("{}", render_summary(&result));

    if !no_save {
        let run_dir = save_artifacts(&result, &output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn init_config(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let toml = BacktestConfig::default().to_toml()?;
    std::fs::write(&path, toml).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
