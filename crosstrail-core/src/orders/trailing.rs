//! Trailing-stop manager: one protective sell per open position.
//!
//! For a long: stop = high_water_mark * (1 - trail_fraction).
//!
//! The high-water mark starts at the entry fill price and is raised by every
//! close while the position stays open; it never moves down. When the
//! position closes, by any route, the mark and the armed order are both
//! discarded so a stale stop can never produce a second exit.

use crate::domain::{Fill, OrderId, OrderNotification, OrderStatus};
use serde::{Deserialize, Serialize};

/// The one outstanding trailing-stop order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmedTrail {
    pub order_id: OrderId,
    pub quantity: f64,
    pub status: OrderStatus,
}

/// What a notification for the armed stop means to the strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrailOutcome {
    /// Submitted/Accepted; still armed.
    Working,
    /// The stop executed; the position is closed.
    Filled(Option<Fill>),
    /// Canceled/Rejected; disarmed and eligible to re-arm next bar.
    Voided(OrderStatus),
}

#[derive(Debug, Clone)]
pub struct TrailingStopManager {
    trail_fraction: f64,
    high_water_mark: Option<f64>,
    armed: Option<ArmedTrail>,
}

impl TrailingStopManager {
    pub fn new(trail_fraction: f64) -> Self {
        assert!(trail_fraction > 0.0, "trail_fraction must be positive");
        assert!(trail_fraction <= 1.0, "trail_fraction must be <= 1.0");
        Self {
            trail_fraction,
            high_water_mark: None,
            armed: None,
        }
    }

    pub fn trail_fraction(&self) -> f64 {
        self.trail_fraction
    }

    pub fn high_water_mark(&self) -> Option<f64> {
        self.high_water_mark
    }

    /// Current trigger level, if a position is being tracked.
    pub fn stop_price(&self) -> Option<f64> {
        self.high_water_mark
            .map(|hwm| hwm * (1.0 - self.trail_fraction))
    }

    pub fn armed(&self) -> Option<&ArmedTrail> {
        self.armed.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn owns(&self, order_id: OrderId) -> bool {
        self.armed.as_ref().is_some_and(|a| a.order_id == order_id)
    }

    /// A position is being tracked and has no stop working.
    pub fn needs_arming(&self) -> bool {
        self.high_water_mark.is_some() && self.armed.is_none()
    }

    /// Start tracking a freshly opened position.
    pub fn on_position_opened(&mut self, entry_price: f64) {
        self.high_water_mark = Some(entry_price);
        self.armed = None;
    }

    /// Raise the high-water mark with this bar's price. No-op while flat.
    pub fn observe(&mut self, price: f64) {
        if !price.is_finite() {
            return;
        }
        if let Some(hwm) = self.high_water_mark.as_mut() {
            if price > *hwm {
                *hwm = price;
            }
        }
    }

    /// Record the stop order just handed to the venue.
    pub fn arm(&mut self, order_id: OrderId, quantity: f64) {
        debug_assert!(
            self.needs_arming(),
            "arm() requires an open position and no working stop"
        );
        self.armed = Some(ArmedTrail {
            order_id,
            quantity,
            status: OrderStatus::Submitted,
        });
    }

    /// Forget the mark and the armed order.
    pub fn on_position_closed(&mut self) -> Option<ArmedTrail> {
        self.high_water_mark = None;
        self.armed.take()
    }

    /// Apply a venue notification for the armed stop.
    pub fn on_status(&mut self, notification: &OrderNotification) -> Option<TrailOutcome> {
        let armed = self
            .armed
            .as_mut()
            .filter(|a| a.order_id == notification.order_id)?;
        armed.status = notification.status;
        Some(match notification.status {
            OrderStatus::Submitted | OrderStatus::Accepted => TrailOutcome::Working,
            OrderStatus::Completed => TrailOutcome::Filled(notification.fill),
            status => {
                self.armed = None;
                TrailOutcome::Voided(status)
            }
        })
    }
}
