//! Backtest runner: wires the strategy, the simulated broker and metrics.
//!
//! Per bar, in order:
//! 1. The broker matches working orders against the new bar.
//! 2. Fills and rejections are delivered to the strategy.
//! 3. The strategy processes the bar and may submit orders.
//! 4. The SUBMITTED/ACCEPTED notifications for those orders are delivered.
//! 5. Equity is marked at the close.
//!
//! Two entry points:
//! - `run_single_backtest()`: resolves the bar feed from the config. Used by CLI.
//! - `run_backtest()`: takes pre-loaded bars, no I/O. Used by sweeps and tests.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crosstrail_core::domain::{Bar, OrderNotification};
use crosstrail_core::orders::OrderEvent;
use crosstrail_core::{CrossoverStrategy, ExecutionVenue, Signal, StrategyError};

use crate::broker::{FillRecord, SimBroker};
use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_bars_csv, load_synthetic, LoadError, LoadedBars};
use crate::metrics::PerformanceMetrics;
use crate::trades::{extract_trades, TradeRecord};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("no bar data: set [backtest] data or use --synthetic")]
    NoData,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Account state at one bar's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub cash: f64,
    pub position: f64,
    pub equity: f64,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub config: BacktestConfig,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub metrics: PerformanceMetrics,
    /// Bars on which a crossover was detected.
    pub signal_count: usize,
    /// Orders that ended canceled or rejected.
    pub not_executed_count: usize,
    /// Notifications the strategy did not recognise.
    pub unmatched_notifications: usize,
    /// Quantity still held at the last bar.
    pub open_quantity: f64,
    pub trades: Vec<TradeRecord>,
    pub fills: Vec<FillRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Developer fallback feed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticOptions {
    pub bars: usize,
    pub seed: u64,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            bars: 750,
            seed: 42,
        }
    }
}

/// Resolve the bar feed for a config and run it.
///
/// An explicit synthetic request wins over the configured data file.
pub fn run_single_backtest(
    config: &BacktestConfig,
    synthetic: Option<SyntheticOptions>,
) -> Result<BacktestResult, RunError> {
    let loaded = resolve_bars(config, synthetic)?;
    run_backtest(config, &loaded)
}

/// Load the bars a config points at.
pub fn resolve_bars(
    config: &BacktestConfig,
    synthetic: Option<SyntheticOptions>,
) -> Result<LoadedBars, RunError> {
    match (synthetic, config.backtest.data.as_deref()) {
        (Some(opts), _) => Ok(load_synthetic(opts.bars, opts.seed)),
        (None, Some(path)) => Ok(load_bars_csv(path)?),
        (None, None) => Err(RunError::NoData),
    }
}

#[derive(Debug, Default)]
struct Counters {
    not_executed: usize,
    unmatched: usize,
}

/// Run a backtest over pre-loaded bars. No I/O.
pub fn run_backtest(config: &BacktestConfig, loaded: &LoadedBars) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let run_id = config.run_id();
    let bars = &loaded.bars;
    info!(
        "run {}: {} bars of {}, fast {} / slow {}",
        run_id,
        bars.len(),
        config.backtest.symbol,
        config.strategy.fast_period,
        config.strategy.slow_period
    );

    let mut strategy = CrossoverStrategy::new(config.strategy.clone())?;
    let mut broker = SimBroker::new(config.backtest.initial_capital, config.backtest.commission);
    let mut counters = Counters::default();
    let mut signal_count = 0;
    let mut equity_curve = Vec::with_capacity(bars.len());

    for bar in bars {
        broker.on_bar_open(bar);
        broker.mark(bar.close);
        let notes = broker.drain_notifications();
        deliver(&mut strategy, &notes, &mut counters)?;

        let report = strategy.on_bar(bar, &mut broker)?;
        if report.signal != Signal::None {
            signal_count += 1;
        }
        let notes = broker.drain_notifications();
        deliver(&mut strategy, &notes, &mut counters)?;

        equity_curve.push(mark_to_market(bar, &broker));
    }

    if warmup_exceeds_feed(config, bars) {
        warn!(
            "feed has {} bars but the slow average needs {}; no signals possible",
            bars.len(),
            config.strategy.warmup_bars()
        );
    }

    let timestamps: Vec<NaiveDateTime> = bars.iter().map(|b| b.timestamp).collect();
    let trades = extract_trades(broker.fills(), &timestamps);
    let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
    let metrics = PerformanceMetrics::compute(&equity, &trades);
    info!(
        "run {} done: final value {:.2}, {} trades, sharpe {:.3}",
        run_id, metrics.final_value, metrics.trade_count, metrics.sharpe
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.synthetic,
        bar_count: bars.len(),
        warmup_bars: config.strategy.warmup_bars(),
        start: timestamps.first().copied(),
        end: timestamps.last().copied(),
        metrics,
        signal_count,
        not_executed_count: counters.not_executed,
        unmatched_notifications: counters.unmatched,
        open_quantity: broker.position_quantity(),
        trades,
        fills: broker.fills().to_vec(),
        equity_curve,
    })
}

fn deliver(
    strategy: &mut CrossoverStrategy,
    notes: &[OrderNotification],
    counters: &mut Counters,
) -> Result<(), RunError> {
    for note in notes {
        match strategy.on_order_status(note) {
            Ok(Some(OrderEvent::NotExecuted { .. })) => counters.not_executed += 1,
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("dropping notification {} {}: {}", note.order_id, note.status, e);
                counters.unmatched += 1;
            }
        }
    }
    Ok(())
}

fn mark_to_market(bar: &Bar, broker: &SimBroker) -> EquityPoint {
    let point = EquityPoint {
        timestamp: bar.timestamp,
        close: bar.close,
        cash: broker.cash(),
        position: broker.position_quantity(),
        equity: broker.equity(),
    };
    debug!("{}: equity {:.2}", bar.timestamp, point.equity);
    point
}

fn warmup_exceeds_feed(config: &BacktestConfig, bars: &[Bar]) -> bool {
    bars.len() < config.strategy.warmup_bars()
}
