//! Performance metrics: pure functions over an equity curve and trade list.

use serde::{Deserialize, Serialize};

use crate::trades::TradeRecord;

/// Bars per year used for annualisation (daily bars).
pub const BARS_PER_YEAR: f64 = 252.0;

/// Aggregate performance of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub starting_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    /// Compound annual growth rate.
    pub annual_return: f64,
    /// Annualised, risk-free rate 0.
    pub sharpe: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[f64], trades: &[TradeRecord]) -> Self {
        Self {
            starting_value: equity_curve.first().copied().unwrap_or(0.0),
            final_value: equity_curve.last().copied().unwrap_or(0.0),
            total_return: total_return(equity_curve),
            annual_return: cagr(equity_curve),
            sharpe: sharpe_ratio(equity_curve),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
        }
    }
}

/// (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match equity_curve {
        [initial, .., last] if *initial > 0.0 => (last - initial) / initial,
        _ => 0.0,
    }
}

/// Compound annual growth rate over the curve's length in bars.
pub fn cagr(equity_curve: &[f64]) -> f64 {
    let [initial, .., last] = equity_curve else {
        return 0.0;
    };
    if *initial <= 0.0 || *last <= 0.0 {
        return 0.0;
    }
    let years = equity_curve.len() as f64 / BARS_PER_YEAR;
    (last / initial).powf(1.0 / years) - 1.0
}

/// Annualised Sharpe ratio of per-bar returns.
///
/// Returns 0.0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(equity_curve: &[f64]) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean(&returns) / std * BARS_PER_YEAR.sqrt()
}

/// Largest peak-to-trough decline as a negative fraction. 0.0 if equity
/// never falls.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            worst = worst.min((eq - peak) / peak);
        }
    }
    worst
}

/// Fraction of round trips with positive net pnl.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profit / gross loss, capped at 100.0 when there are no losses.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let (profit, loss) = trades.iter().fold((0.0, 0.0), |(p, l), t| {
        if t.pnl > 0.0 {
            (p + t.pnl, l)
        } else {
            (p, l - t.pnl)
        }
    });
    if loss < 1e-10 {
        return if profit > 0.0 { 100.0 } else { 0.0 };
    }
    (profit / loss).min(100.0)
}

/// Per-bar simple returns.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1).
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
