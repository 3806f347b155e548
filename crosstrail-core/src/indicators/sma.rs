//! Simple Moving Average (SMA), updated one close at a time.
//!
//! Keeps the last `period` closes and a running sum. The sum is rebuilt
//! exactly from the window once every `period` updates, which bounds
//! floating-point drift on long series at amortized O(1) cost.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingSma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    updates_since_resum: usize,
}

impl RollingSma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
            updates_since_resum: 0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Push a close and return the new average (None until the window fills).
    pub fn push(&mut self, close: f64) -> Option<f64> {
        self.window.push_back(close);
        self.sum += close;
        if self.window.len() > self.period {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }

        self.updates_since_resum += 1;
        if self.updates_since_resum >= self.period {
            self.sum = self.window.iter().sum();
            self.updates_since_resum = 0;
        }

        self.value()
    }

    /// Current average, or None during warm-up.
    pub fn value(&self) -> Option<f64> {
        if self.window.len() == self.period {
            Some(self.sum / self.period as f64)
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.window.len() == self.period
    }
}
