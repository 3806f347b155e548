//! Crosstrail CLI: run and sweep commands.
//!
//! Commands:
//! - `run`: backtest the crossover strategy from a TOML config and/or flags
//! - `sweep`: evaluate a grid of fast/slow periods in parallel
//!
//! Logging goes to stderr. `RUST_LOG` overrides the level; `-v` raises the
//! default from `info` to `debug`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crosstrail_runner::{
    resolve_bars, run_backtest, run_sweep, save_run, save_sweep, BacktestConfig, BacktestResult,
    ParamGrid, SyntheticOptions,
};

#[derive(Parser)]
#[command(
    name = "crosstrail",
    about = "Crosstrail, moving average crossover backtester with a trailing stop"
)]
struct Cli {
    /// Verbose logging (per-bar decisions and fills).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest.
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Fast SMA period.
        #[arg(long)]
        fast: Option<usize>,

        /// Slow SMA period.
        #[arg(long)]
        slow: Option<usize>,
    },
    /// Sweep fast/slow period pairs and rank them by Sharpe ratio.
    Sweep {
        #[command(flatten)]
        common: CommonArgs,

        /// Fast periods, comma-separated.
        #[arg(long, value_delimiter = ',', default_values_t = [10, 20, 50])]
        fast: Vec<usize>,

        /// Slow periods, comma-separated.
        #[arg(long, value_delimiter = ',', default_values_t = [100, 200])]
        slow: Vec<usize>,

        /// How many ranked results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV bar file (overrides the config's data path).
    #[arg(long)]
    data: Option<PathBuf>,

    /// Use seeded synthetic bars instead of a data file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Number of synthetic bars.
    #[arg(long, default_value_t = 750)]
    synthetic_bars: usize,

    /// Seed for synthetic bars.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Fraction of equity risked per trade.
    #[arg(long)]
    risk: Option<f64>,

    /// Assumed stop distance as a fraction of price, for sizing.
    #[arg(long)]
    stop_distance: Option<f64>,

    /// Trailing stop distance as a fraction of the high-water mark.
    #[arg(long)]
    trail: Option<f64>,

    /// Starting cash.
    #[arg(long)]
    capital: Option<f64>,

    /// Commission as a fraction of traded value.
    #[arg(long)]
    commission: Option<f64>,

    /// Output directory for run artifacts.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Do not write artifacts.
    #[arg(long, default_value_t = false)]
    no_save: bool,
}

impl CommonArgs {
    fn build_config(&self) -> Result<BacktestConfig> {
        let mut config = match &self.config {
            Some(path) => BacktestConfig::from_file(path)?,
            None => BacktestConfig::default(),
        };
        if let Some(data) = &self.data {
            config.backtest.data = Some(data.clone());
        }
        let strategy = &mut config.strategy;
        if let Some(v) = self.risk {
            strategy.risk_fraction = v;
        }
        if let Some(v) = self.stop_distance {
            strategy.stop_distance_fraction = v;
        }
        if let Some(v) = self.trail {
            strategy.trailing_stop_fraction = v;
        }
        if let Some(v) = self.capital {
            config.backtest.initial_capital = v;
        }
        if let Some(v) = self.commission {
            config.backtest.commission = v;
        }
        Ok(config)
    }

    fn synthetic(&self) -> Option<SyntheticOptions> {
        self.synthetic.then_some(SyntheticOptions {
            bars: self.synthetic_bars,
            seed: self.seed,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { common, fast, slow } => run_cmd(&common, fast, slow),
        Commands::Sweep {
            common,
            fast,
            slow,
            top,
            sequential,
        } => sweep_cmd(&common, fast, slow, top, !sequential),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_cmd(common: &CommonArgs, fast: Option<usize>, slow: Option<usize>) -> Result<()> {
    let mut config = common.build_config()?;
    if let Some(v) = fast {
        config.strategy.fast_period = v;
    }
    if let Some(v) = slow {
        config.strategy.slow_period = v;
    }
    config.validate().context("invalid configuration")?;
    tracing::debug!("run config: {:?}", config);

    let bars = resolve_bars(&config, common.synthetic())?;
    let result = run_backtest(&config, &bars)?;
    print_summary(&result);

    if !common.no_save {
        let paths = save_run(&common.output_dir, &result)?;
        println!("Artifacts saved to: {}", paths.run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(
    common: &CommonArgs,
    fast: Vec<usize>,
    slow: Vec<usize>,
    top: usize,
    parallel: bool,
) -> Result<()> {
    let grid = ParamGrid {
        fast_periods: fast,
        slow_periods: slow,
    };
    if grid.size() == 0 {
        bail!("no valid (fast < slow) pairs in the grid");
    }
    let base = common.build_config()?;
    let bars = resolve_bars(&base, common.synthetic())?;
    let sweep = run_sweep(&grid, &base, &bars, parallel)?;

    println!();
    println!("=== Sweep: {} configurations ===", sweep.len());
    println!(
        "{:>4}  {:>5}  {:>5}  {:>8}  {:>9}  {:>9}  {:>6}",
        "rank", "fast", "slow", "sharpe", "return", "max dd", "trades"
    );
    for (i, r) in sweep.top_n(top).into_iter().enumerate() {
        println!(
            "{:>4}  {:>5}  {:>5}  {:>8.3}  {:>8.2}%  {:>8.2}%  {:>6}",
            i + 1,
            r.config.strategy.fast_period,
            r.config.strategy.slow_period,
            r.metrics.sharpe,
            r.metrics.total_return * 100.0,
            r.metrics.max_drawdown * 100.0,
            r.metrics.trade_count
        );
    }
    if bars.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }

    if !common.no_save {
        let path = save_sweep(&common.output_dir, &sweep)?;
        println!("Sweep summary saved to: {}", path.display());
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:           {}", result.config.backtest.symbol);
    if let (Some(start), Some(end)) = (result.start, result.end) {
        println!("Period:           {} to {}", start.date(), end.date());
    }
    println!(
        "Bars:             {} ({} warmup)",
        result.bar_count, result.warmup_bars
    );
    println!(
        "Fast / Slow:      {} / {}",
        result.config.strategy.fast_period, result.config.strategy.slow_period
    );
    println!();
    println!("Starting Value:   {:.2}", m.starting_value);
    println!("Final Value:      {:.2}", m.final_value);
    println!("Sharpe Ratio:     {:.3}", m.sharpe);
    println!("Max Drawdown:     {:.2}%", m.max_drawdown * 100.0);
    println!("Annual Return:    {:.2}%", m.annual_return * 100.0);
    println!("Total Return:     {:.2}%", m.total_return * 100.0);
    println!();
    println!("Signals:          {}", result.signal_count);
    println!("Trades:           {}", m.trade_count);
    println!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:    {:.2}", m.profit_factor);
    println!("Not Executed:     {}", result.not_executed_count);
    if result.open_quantity > 0.0 {
        println!("Open Position:    {:.4}", result.open_quantity);
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    if result.unmatched_notifications > 0 {
        println!(
            "WARNING: {} order notifications did not match a known order",
            result.unmatched_notifications
        );
    }
}
