//! Parameter sweep over fast/slow period grids.
//!
//! Each grid point runs its own strategy and broker, so points are
//! independent and evaluated in parallel with rayon.

use rayon::prelude::*;
use std::collections::HashMap;

use crate::config::BacktestConfig;
use crate::data_loader::LoadedBars;
use crate::runner::{run_backtest, BacktestResult, RunError};

/// Period grid to sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    pub fast_periods: Vec<usize>,
    pub slow_periods: Vec<usize>,
}

impl Default for ParamGrid {
    /// Fast 10/20/50, slow 100/200.
    fn default() -> Self {
        Self {
            fast_periods: vec![10, 20, 50],
            slow_periods: vec![100, 200],
        }
    }
}

impl ParamGrid {
    /// Every valid (fast < slow) configuration, derived from `base`.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::new();
        for &fast in &self.fast_periods {
            for &slow in &self.slow_periods {
                if fast == 0 || fast >= slow {
                    continue;
                }
                let mut config = base.clone();
                config.strategy.fast_period = fast;
                config.strategy.slow_period = slow;
                configs.push(config);
            }
        }
        configs
    }

    pub fn size(&self) -> usize {
        self.fast_periods
            .iter()
            .flat_map(|f| self.slow_periods.iter().map(move |s| (*f, *s)))
            .filter(|&(f, s)| f > 0 && f < s)
            .count()
    }
}

/// Run every grid point over the same bars.
pub fn run_sweep(
    grid: &ParamGrid,
    base: &BacktestConfig,
    bars: &LoadedBars,
    parallel: bool,
) -> Result<SweepResults, RunError> {
    let configs = grid.generate_configs(base);
    tracing::info!("sweeping {} configurations", configs.len());

    let results = if parallel {
        configs
            .par_iter()
            .map(|config| run_backtest(config, bars))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        configs
            .iter()
            .map(|config| run_backtest(config, bars))
            .collect::<Result<Vec<_>, _>>()?
    };
    Ok(SweepResults::new(results))
}

/// Results of a sweep, in grid order.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Results by Sharpe ratio, best first.
    pub fn ranked(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| b.metrics.sharpe.total_cmp(&a.metrics.sharpe));
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&BacktestResult> {
        self.ranked().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.ranked().into_iter().next()
    }
}
