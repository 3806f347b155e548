//! Artifact export for run outputs.
//!
//! Layout under the output directory:
//! ```text
//! <out>/<run_id>/result.json   full BacktestResult
//! <out>/<run_id>/trades.csv    one row per round trip
//! <out>/<run_id>/equity.csv    one row per bar
//! <out>/sweep.csv              one row per grid point (sweeps only)
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::runner::BacktestResult;
use crate::sweep::SweepResults;

/// Paths written by `save_run`.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub result_json: PathBuf,
    pub trades_csv: PathBuf,
    pub equity_csv: PathBuf,
}

/// Write every artifact for one run.
pub fn save_run(output_dir: &Path, result: &BacktestResult) -> Result<ArtifactPaths> {
    let run_dir = output_dir.join(&result.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create run directory {}", run_dir.display()))?;

    let result_json = run_dir.join("result.json");
    let json = serde_json::to_string_pretty(result).context("Failed to serialize result")?;
    std::fs::write(&result_json, json)
        .with_context(|| format!("Failed to write {}", result_json.display()))?;

    let trades_csv = run_dir.join("trades.csv");
    write_csv(&trades_csv, &result.trades)?;

    let equity_csv = run_dir.join("equity.csv");
    write_csv(&equity_csv, &result.equity_curve)?;

    tracing::info!("artifacts written to {}", run_dir.display());
    Ok(ArtifactPaths {
        run_dir,
        result_json,
        trades_csv,
        equity_csv,
    })
}

/// Read back a `result.json`.
pub fn load_result(path: &Path) -> Result<BacktestResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

#[derive(Serialize)]
struct SweepRow<'a> {
    rank: usize,
    run_id: &'a str,
    fast_period: usize,
    slow_period: usize,
    sharpe: f64,
    total_return: f64,
    annual_return: f64,
    max_drawdown: f64,
    trade_count: usize,
    win_rate: f64,
}

/// Write the ranked sweep summary to `<out>/sweep.csv`.
pub fn save_sweep(output_dir: &Path, sweep: &SweepResults) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let rows: Vec<SweepRow> = sweep
        .ranked()
        .into_iter()
        .enumerate()
        .map(|(i, r)| SweepRow {
            rank: i + 1,
            run_id: &r.run_id,
            fast_period: r.config.strategy.fast_period,
            slow_period: r.config.strategy.slow_period,
            sharpe: r.metrics.sharpe,
            total_return: r.metrics.total_return,
            annual_return: r.metrics.annual_return,
            max_drawdown: r.metrics.max_drawdown,
            trade_count: r.metrics.trade_count,
            win_rate: r.metrics.win_rate,
        })
        .collect();
    let path = output_dir.join("sweep.csv");
    write_csv(&path, &rows)?;
    Ok(path)
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}
