//! Crosstrail Runner: backtest orchestration around the core strategy.
//!
//! This crate builds on `crosstrail-core` to provide:
//! - Bar loading from CSV, with a seeded synthetic fallback
//! - A simulated broker implementing the execution venue
//! - Single-backtest runner with trade extraction and metrics
//! - Parallel fast/slow parameter sweeps
//! - JSON/CSV run artifacts

pub mod artifacts;
pub mod broker;
pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod runner;
pub mod sweep;
pub mod trades;

pub use artifacts::{load_result, save_run, save_sweep, ArtifactPaths};
pub use broker::{FillRecord, SimBroker};
pub use config::{BacktestConfig, BacktestSection, ConfigError};
pub use data_loader::{load_bars_csv, load_synthetic, read_bars, synthetic_bars, LoadError, LoadedBars};
pub use metrics::PerformanceMetrics;
pub use runner::{
    resolve_bars, run_backtest, run_single_backtest, BacktestResult, EquityPoint, RunError,
    SyntheticOptions,
};
pub use sweep::{run_sweep, ParamGrid, SweepResults};
pub use trades::{extract_trades, TradeRecord};
