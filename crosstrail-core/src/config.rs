//! Risk and indicator parameters, fixed for a strategy's lifetime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be in (0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be >= 1")]
    ZeroPeriod { name: &'static str },

    #[error("fast_period ({fast}) must be < slow_period ({slow})")]
    PeriodOrder { fast: usize, slow: usize },
}

/// Strategy parameters.
///
/// `stop_distance_fraction` is only the stop distance the sizer assumes;
/// it is independent of `trailing_stop_fraction`, which drives the actual
/// protective order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub risk_fraction: f64,
    pub stop_distance_fraction: f64,
    pub trailing_stop_fraction: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            fast_period: 50,
            slow_period: 200,
            risk_fraction: 0.02,
            stop_distance_fraction: 0.03,
            trailing_stop_fraction: 0.03,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("risk_fraction", self.risk_fraction)?;
        check_fraction("stop_distance_fraction", self.stop_distance_fraction)?;
        check_fraction("trailing_stop_fraction", self.trailing_stop_fraction)?;
        if self.fast_period == 0 {
            return Err(ConfigError::ZeroPeriod {
                name: "fast_period",
            });
        }
        if self.slow_period == 0 {
            return Err(ConfigError::ZeroPeriod {
                name: "slow_period",
            });
        }
        if self.fast_period >= self.slow_period {
            return Err(ConfigError::PeriodOrder {
                fast: self.fast_period,
                slow: self.slow_period,
            });
        }
        Ok(())
    }

    /// Bars needed before both averages and their previous values exist.
    pub fn warmup_bars(&self) -> usize {
        self.slow_period + 1
    }
}

fn check_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    // NaN fails both comparisons and is rejected here too.
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange { name, value })
    }
}
