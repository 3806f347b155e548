//! Position sizing: fixed fractional risk.
//!
//! quantity = (equity * risk_fraction) / (last_close * stop_distance_fraction)
//!
//! The sizer assumes the stop sits `stop_distance_fraction` below the last
//! close and risks `risk_fraction` of equity on that distance.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SizingError {
    #[error("invalid sizing: account equity must be positive, got {equity}")]
    NonPositiveEquity { equity: f64 },

    #[error("invalid sizing: stop distance must be positive, got {stop_distance}")]
    NonPositiveStopDistance { stop_distance: f64 },

    #[error("invalid sizing: risk amount must be positive, got {risk_amount}")]
    NonPositiveRisk { risk_amount: f64 },
}

/// Translate an equity figure and a price into a trade quantity.
pub trait Sizer: Send + Sync {
    fn size(&self, account_equity: f64, last_close: f64) -> Result<f64, SizingError>;

    /// Sizer name for logging.
    fn name(&self) -> &str;
}

/// Compute the quantity for one entry.
pub fn size(
    account_equity: f64,
    last_close: f64,
    risk_fraction: f64,
    stop_distance_fraction: f64,
) -> Result<f64, SizingError> {
    if account_equity.is_nan() || account_equity <= 0.0 {
        return Err(SizingError::NonPositiveEquity {
            equity: account_equity,
        });
    }
    let stop_distance = last_close * stop_distance_fraction;
    if stop_distance.is_nan() || stop_distance <= 0.0 {
        return Err(SizingError::NonPositiveStopDistance { stop_distance });
    }
    let risk_amount = account_equity * risk_fraction;
    if risk_amount.is_nan() || risk_amount <= 0.0 {
        return Err(SizingError::NonPositiveRisk { risk_amount });
    }
    Ok(risk_amount / stop_distance)
}

/// Fixed fractional sizer bound to one risk configuration.
#[derive(Debug, Clone)]
pub struct FixedFractional {
    pub risk_fraction: f64,
    pub stop_distance_fraction: f64,
}

impl FixedFractional {
    pub fn new(risk_fraction: f64, stop_distance_fraction: f64) -> Self {
        Self {
            risk_fraction,
            stop_distance_fraction,
        }
    }
}

impl Sizer for FixedFractional {
    fn size(&self, account_equity: f64, last_close: f64) -> Result<f64, SizingError> {
        size(
            account_equity,
            last_close,
            self.risk_fraction,
            self.stop_distance_fraction,
        )
    }

    fn name(&self) -> &str {
        "fixed_fractional"
    }
}
