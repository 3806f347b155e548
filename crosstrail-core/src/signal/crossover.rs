//! Moving average crossover detection: golden cross and death cross.
//!
//! Fires `EnterLong` when the fast MA crosses from at-or-below the slow MA to
//! strictly above it. Fires `ExitLong` on the mirror transition. A bar where
//! the averages are exactly equal never fires by itself.

use crate::indicators::IndicatorSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional signal derived from one bar's indicator snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    #[default]
    None,
    EnterLong,
    ExitLong,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::None => "none",
            Signal::EnterLong => "enter_long",
            Signal::ExitLong => "exit_long",
        };
        f.write_str(s)
    }
}

/// Classify the transition between the previous and current bar.
///
/// Returns `Signal::None` whenever any value is undefined or NaN.
pub fn detect(
    fast: Option<f64>,
    slow: Option<f64>,
    fast_prev: Option<f64>,
    slow_prev: Option<f64>,
) -> Signal {
    let (Some(fast), Some(slow), Some(fast_prev), Some(slow_prev)) =
        (fast, slow, fast_prev, slow_prev)
    else {
        return Signal::None;
    };

    if fast.is_nan() || slow.is_nan() || fast_prev.is_nan() || slow_prev.is_nan() {
        return Signal::None;
    }

    // Golden cross: previous bar fast <= slow, current bar fast > slow.
    if fast > slow && fast_prev <= slow_prev {
        return Signal::EnterLong;
    }

    // Death cross: previous bar fast >= slow, current bar fast < slow.
    if fast < slow && fast_prev >= slow_prev {
        return Signal::ExitLong;
    }

    Signal::None
}

/// `detect` over an engine snapshot.
pub fn detect_snapshot(snapshot: &IndicatorSnapshot) -> Signal {
    detect(
        snapshot.fast,
        snapshot.slow,
        snapshot.fast_prev,
        snapshot.slow_prev,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(fast: f64, slow: f64, fast_prev: f64, slow_prev: f64) -> Signal {
        detect(Some(fast), Some(slow), Some(fast_prev), Some(slow_prev))
    }

    #[test]
    fn fires_enter_on_golden_cross() {
        assert_eq!(d(105.0, 100.0, 95.0, 100.0), Signal::EnterLong);
    }

    #[test]
    fn fires_enter_when_previous_bar_was_equal() {
        assert_eq!(d(101.0, 100.0, 100.0, 100.0), Signal::EnterLong);
    }

    #[test]
    fn fires_exit_on_death_cross() {
        assert_eq!(d(95.0, 100.0, 105.0, 100.0), Signal::ExitLong);
        assert_eq!(d(99.0, 100.0, 100.0, 100.0), Signal::ExitLong);
    }

    #[test]
    fn equality_on_current_bar_never_fires() {
        assert_eq!(d(100.0, 100.0, 95.0, 100.0), Signal::None);
        assert_eq!(d(100.0, 100.0, 105.0, 100.0), Signal::None);
    }

    #[test]
    fn no_fire_when_trend_continues() {
        assert_eq!(d(106.0, 100.0, 105.0, 100.0), Signal::None);
        assert_eq!(d(94.0, 100.0, 95.0, 100.0), Signal::None);
    }

    #[test]
    fn warmup_values_give_none() {
        assert_eq!(detect(Some(105.0), None, Some(95.0), Some(100.0)), Signal::None);
        assert_eq!(detect(Some(105.0), Some(100.0), None, Some(100.0)), Signal::None);
        assert_eq!(detect(None, None, None, None), Signal::None);
    }

    #[test]
    fn nan_values_give_none() {
        assert_eq!(d(f64::NAN, 100.0, 95.0, 100.0), Signal::None);
        assert_eq!(d(105.0, 100.0, 95.0, f64::NAN), Signal::None);
    }

    #[test]
    fn snapshot_wrapper_matches() {
        let snap = IndicatorSnapshot {
            fast: Some(105.0),
            slow: Some(100.0),
            fast_prev: Some(95.0),
            slow_prev: Some(100.0),
        };
        assert_eq!(detect_snapshot(&snap), Signal::EnterLong);
    }
}
