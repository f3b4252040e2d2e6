//! Reporting and export — JSON, CSV, and plain-text artifact generation.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape for external analysis tools
//! - **Text**: the console summary printed after a run
//!
//! Persisted results carry a `schema_version` field. Newer versions are
//! rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bandlab_core::domain::TradeRecord;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV, one row per trade in ledger order.
///
/// Undefined excursion fields are written as empty cells.
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "session",
        "direction",
        "entry_time",
        "entry_price",
        "exit_time",
        "exit_price",
        "duration_minutes",
        "gross_pnl",
        "pnl",
        "fee",
        "adverse_price",
        "adverse_pct",
        "drawdown",
    ])?;

    let opt = |v: Option<f64>, prec: usize| v.map(|x| format!("{x:.prec$}")).unwrap_or_default();
    for t in trades {
        wtr.write_record([
            &t.session.to_string(),
            t.direction.as_str(),
            &t.entry_time.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_time.to_string(),
            &format!("{:.6}", t.exit_price),
            &t.duration_minutes.to_string(),
            &format!("{:.2}", t.gross_pnl()),
            &format!("{:.2}", t.pnl),
            &format!("{:.2}", t.fee),
            &opt(t.adverse_price, 6),
            &opt(t.adverse_pct, 6),
            &opt(t.drawdown, 2),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Text summary ───────────────────────────────────────────────────

/// Render the console summary of a run.
pub fn render_summary(result: &BacktestResult) -> String {
    let e = &result.evaluation;
    let na = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |x| format!("{x:.2}"));

    let mut out = String::new();
    if result.has_synthetic {
        out.push_str("WARNING: results computed on SYNTHETIC data\n");
    }
    let _ = writeln!(
        out,
        "Sessions: {} simulated, {} skipped ({} bars)",
        result.session_count, result.skipped_sessions, result.bar_count
    );
    let _ = writeln!(out, "PnL({}): {:.2}", e.trade_count, e.total_pnl);
    let _ = writeln!(out, "Risk(1): {:.2}", result.config.costs.capital_per_trade);
    let _ = writeln!(out, "PnL(1): {}", na(e.avg_pnl));
    let _ = writeln!(out, "DD(1): {}", na(e.avg_drawdown));
    let _ = writeln!(out, "Worst DD(1): {}", na(e.worst_drawdown));
    let _ = writeln!(out, "Duration(1): {} min", na(e.avg_duration_minutes));
    let _ = writeln!(
        out,
        "Win rate: {:.1}%  Profit factor: {:.2}  Max losing streak: {}",
        e.win_rate * 100.0,
        e.profit_factor,
        e.max_consecutive_losses
    );
    let _ = write!(out, "Run id: {}", &result.run_id[..result.run_id.len().min(12)]);
    out
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `run_{run_id prefix}_{timestamp}/` under
/// `output_dir` containing:
/// - `result.json` — the full `BacktestResult`
/// - `trades.csv` — the trade tape
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "run_{}_{}",
        &result.run_id[..result.run_id.len().min(12)],
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    std::fs::write(run_dir.join("result.json"), &json)?;

    let trades_csv = export_trades_csv(result.trades.as_slice())?;
    std::fs::write(run_dir.join("trades.csv"), &trades_csv)?;

    log::info!("artifacts written to {}", run_dir.display());
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's result.json.
pub fn load_artifacts(run_dir: &Path) -> Result<BacktestResult> {
    let path = run_dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
