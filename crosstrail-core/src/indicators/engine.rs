//! Indicator engine: the fast and slow averages plus their one-bar-lagged values.

use super::sma::RollingSma;
use serde::{Deserialize, Serialize};

/// Current and previous values of both averages after one update.
///
/// Any field is None while its window is still filling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub fast: Option<f64>,
    pub slow: Option<f64>,
    pub fast_prev: Option<f64>,
    pub slow_prev: Option<f64>,
}

impl IndicatorSnapshot {
    /// True once all four values are defined.
    pub fn is_complete(&self) -> bool {
        self.fast.is_some()
            && self.slow.is_some()
            && self.fast_prev.is_some()
            && self.slow_prev.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    fast: RollingSma,
    slow: RollingSma,
    fast_prev: Option<f64>,
    slow_prev: Option<f64>,
    bars_seen: usize,
}

impl IndicatorEngine {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        Self {
            fast: RollingSma::new(fast_period),
            slow: RollingSma::new(slow_period),
            fast_prev: None,
            slow_prev: None,
            bars_seen: 0,
        }
    }

    /// Feed one close. The returned `*_prev` fields hold the values from the
    /// bar before this one.
    pub fn update(&mut self, close: f64) -> IndicatorSnapshot {
        let fast_prev = self.fast_prev;
        let slow_prev = self.slow_prev;

        let fast = self.fast.push(close);
        let slow = self.slow.push(close);
        self.fast_prev = fast;
        self.slow_prev = slow;
        self.bars_seen += 1;

        IndicatorSnapshot {
            fast,
            slow,
            fast_prev,
            slow_prev,
        }
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn fast_period(&self) -> usize {
        self.fast.period()
    }

    pub fn slow_period(&self) -> usize {
        self.slow.period()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lagged_values_trail_by_one_bar() {
        let mut engine = IndicatorEngine::new(2, 3);

        let s1 = engine.update(10.0);
        assert_eq!(s1, IndicatorSnapshot::default());

        let s2 = engine.update(12.0);
        assert_eq!(s2.fast, Some(11.0));
        assert_eq!(s2.fast_prev, None);
        assert_eq!(s2.slow, None);

        let s3 = engine.update(14.0);
        assert_eq!(s3.fast, Some(13.0));
        assert_eq!(s3.fast_prev, Some(11.0));
        assert_eq!(s3.slow, Some(12.0));
        assert_eq!(s3.slow_prev, None);
        assert!(!s3.is_complete());

        let s4 = engine.update(16.0);
        assert_eq!(s4.fast_prev, Some(13.0));
        assert_eq!(s4.slow_prev, Some(12.0));
        assert_eq!(s4.slow, Some(14.0));
        assert!(s4.is_complete());
        assert_eq!(engine.bars_seen(), 4);
    }

    #[test]
    fn fresh_engines_are_deterministic() {
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + (i as f64 * 0.2).cos()).collect();
        let run = |closes: &[f64]| {
            let mut e = IndicatorEngine::new(5, 20);
            closes.iter().map(|&c| e.update(c)).collect::<Vec<_>>()
        };
        assert_eq!(run(&closes), run(&closes));
    }
}
