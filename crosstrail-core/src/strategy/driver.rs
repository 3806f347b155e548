//! Strategy driver: one decision pass per bar.
//!
//! Per bar, in order:
//! 1. Reject the bar if its timestamp does not advance or its close is unusable.
//! 2. Update the fast/slow averages and the trailing high-water mark.
//! 3. If the entry/exit slot is pending, stop here.
//! 4. Flat: on a golden cross, size the trade and request an entry.
//! 5. Long: on a death cross, request an exit; independently, arm the
//!    trailing stop if none is working.
//!
//! Steps 4 and 5 are mutually exclusive. Order notifications arrive between
//! bars through `on_order_status`.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, RiskConfig};
use crate::domain::{
    Bar, OrderId, OrderIdGen, OrderKind, OrderNotification, OrderRequest, PendingOrder, Position,
};
use crate::indicators::{IndicatorEngine, IndicatorSnapshot};
use crate::orders::{
    OrderAuditEntry, OrderEvent, OrderLifecycleTracker, TrackerError, TrackerState, TrailOutcome,
    TrailingStopManager,
};
use crate::signal::{detect_snapshot, Signal};
use crate::sizing::{FixedFractional, Sizer};

use super::venue::ExecutionVenue;

/// Errors from the driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("bar at {current} does not follow previous bar at {previous}")]
    OutOfOrderBar {
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("malformed bar at {timestamp}: close = {close}")]
    MalformedBar { timestamp: NaiveDateTime, close: f64 },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("order tracking error: {0}")]
    Tracker(#[from] TrackerError),
}

impl StrategyError {
    /// Errors that invalidate the whole run (the bar stream itself is bad).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StrategyError::OutOfOrderBar { .. } | StrategyError::MalformedBar { .. }
        )
    }
}

/// Why a bar produced no decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// An entry/exit order is still working.
    OrderWorking(OrderId),
    /// Golden cross seen but the sizer refused; no trade this bar.
    SizingFailed(String),
}

/// What happened on one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarReport {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub snapshot: IndicatorSnapshot,
    pub signal: Signal,
    pub requests: Vec<OrderRequest>,
    pub skipped: Option<SkipReason>,
}

/// Long-only moving average crossover strategy with fractional-risk sizing
/// and a trailing stop.
///
/// Owns all per-instrument state. Run one instance per instrument.
#[derive(Debug, Clone)]
pub struct CrossoverStrategy {
    config: RiskConfig,
    sizer: FixedFractional,
    indicators: IndicatorEngine,
    tracker: OrderLifecycleTracker,
    trailing: TrailingStopManager,
    order_ids: OrderIdGen,
    last_timestamp: Option<NaiveDateTime>,
    last_close: Option<f64>,
    voided_stops: HashSet<OrderId>,
    bars_processed: usize,
}

impl CrossoverStrategy {
    pub fn new(config: RiskConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self {
            sizer: FixedFractional::new(config.risk_fraction, config.stop_distance_fraction),
            indicators: IndicatorEngine::new(config.fast_period, config.slow_period),
            tracker: OrderLifecycleTracker::new(),
            trailing: TrailingStopManager::new(config.trailing_stop_fraction),
            order_ids: OrderIdGen::new(),
            last_timestamp: None,
            last_close: None,
            voided_stops: HashSet::new(),
            bars_processed: 0,
            config,
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn position(&self) -> &Position {
        self.tracker.position()
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.tracker.state()
    }

    pub fn pending_order(&self) -> Option<&PendingOrder> {
        self.tracker.pending()
    }

    pub fn trailing(&self) -> &TrailingStopManager {
        &self.trailing
    }

    pub fn audit_trail(&self) -> &[OrderAuditEntry] {
        self.tracker.audit_trail()
    }

    pub fn bars_processed(&self) -> usize {
        self.bars_processed
    }

    /// Process one bar. Errors from a malformed or out-of-order bar are fatal
    /// for the run.
    pub fn on_bar(
        &mut self,
        bar: &Bar,
        venue: &mut dyn ExecutionVenue,
    ) -> Result<BarReport, StrategyError> {
        self.check_bar(bar)?;
        self.last_timestamp = Some(bar.timestamp);
        self.last_close = Some(bar.close);
        let bar_index = self.bars_processed;
        self.bars_processed += 1;

        let snapshot = self.indicators.update(bar.close);
        self.trailing.observe(bar.close);

        let mut report = BarReport {
            bar_index,
            timestamp: bar.timestamp,
            snapshot,
            signal: Signal::None,
            requests: Vec::new(),
            skipped: None,
        };

        if let Some(working) = self.tracker.pending() {
            debug!(
                "{}: order {} ({}) still working, skipping",
                bar.timestamp, working.id, working.kind
            );
            report.skipped = Some(SkipReason::OrderWorking(working.id));
            return Ok(report);
        }

        report.signal = detect_snapshot(&snapshot);

        if !self.tracker.position().is_open() {
            if report.signal == Signal::EnterLong {
                self.request_entry(bar, venue, &mut report)?;
            }
            return Ok(report);
        }

        if report.signal == Signal::ExitLong {
            let quantity = self.tracker.position().quantity;
            let request = self.claim_slot(OrderKind::Exit, quantity)?;
            info!(
                "{}: death cross, exit {} requested for {:.4}",
                bar.timestamp, request.id, quantity
            );
            venue.submit(&request);
            report.requests.push(request);
        }

        if self.trailing.needs_arming() {
            let quantity = self.tracker.position().quantity;
            let request = OrderRequest {
                id: self.order_ids.next_id(),
                kind: OrderKind::TrailingStop,
                quantity,
                trail_fraction: Some(self.trailing.trail_fraction()),
            };
            self.trailing.arm(request.id, quantity);
            info!(
                "{}: trailing stop {} armed at {:.2}% below high-water mark {:.4}",
                bar.timestamp,
                request.id,
                self.trailing.trail_fraction() * 100.0,
                self.trailing.high_water_mark().unwrap_or(bar.close)
            );
            venue.submit(&request);
            report.requests.push(request);
        }

        Ok(report)
    }

    /// Apply a status notification from the venue.
    ///
    /// Returns the position-level event when the notification was terminal.
    /// Notifications for trailing stops voided by an earlier close are
    /// ignored.
    pub fn on_order_status(
        &mut self,
        notification: &OrderNotification,
    ) -> Result<Option<OrderEvent>, StrategyError> {
        let order_id = notification.order_id;
        let fallback_price = self.last_close.unwrap_or(0.0);

        if self.tracker.owns(order_id) {
            let event = self
                .tracker
                .on_status(notification, fallback_price, self.last_timestamp)?;
            self.after_event(event.as_ref());
            return Ok(event);
        }

        if self.trailing.owns(order_id) {
            return match self.trailing.on_status(notification) {
                None | Some(TrailOutcome::Working) => Ok(None),
                Some(TrailOutcome::Filled(fill)) => {
                    let event = self
                        .tracker
                        .close_by_stop(order_id, fill, fallback_price)?;
                    self.after_event(Some(&event));
                    Ok(Some(event))
                }
                Some(TrailOutcome::Voided(status)) => {
                    let event = OrderEvent::NotExecuted {
                        order_id,
                        kind: OrderKind::TrailingStop,
                        status,
                    };
                    self.after_event(Some(&event));
                    Ok(Some(event))
                }
            };
        }

        if self.voided_stops.contains(&order_id) {
            debug!(
                "ignoring {} for voided trailing stop {}",
                notification.status, order_id
            );
            if notification.status.is_terminal() {
                self.voided_stops.remove(&order_id);
            }
            return Ok(None);
        }

        Err(TrackerError::UnknownOrder(order_id).into())
    }

    fn check_bar(&self, bar: &Bar) -> Result<(), StrategyError> {
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(StrategyError::OutOfOrderBar {
                    previous,
                    current: bar.timestamp,
                });
            }
        }
        if !bar.has_usable_close() {
            return Err(StrategyError::MalformedBar {
                timestamp: bar.timestamp,
                close: bar.close,
            });
        }
        Ok(())
    }

    fn request_entry(
        &mut self,
        bar: &Bar,
        venue: &mut dyn ExecutionVenue,
        report: &mut BarReport,
    ) -> Result<(), StrategyError> {
        let equity = venue.equity();
        let quantity = match self.sizer.size(equity, bar.close) {
            Ok(q) => q,
            Err(e) => {
                warn!("{}: golden cross but no entry: {}", bar.timestamp, e);
                report.skipped = Some(SkipReason::SizingFailed(e.to_string()));
                return Ok(());
            }
        };
        let request = self.claim_slot(OrderKind::Entry, quantity)?;
        info!(
            "{}: golden cross, entry {} requested for {:.4} (equity {:.2}, close {:.4})",
            bar.timestamp, request.id, quantity, equity, bar.close
        );
        venue.submit(&request);
        report.requests.push(request);
        Ok(())
    }

    fn claim_slot(&mut self, kind: OrderKind, quantity: f64) -> Result<OrderRequest, TrackerError> {
        let id = self.order_ids.next_id();
        self.tracker.request(id, kind, quantity)?;
        Ok(OrderRequest {
            id,
            kind,
            quantity,
            trail_fraction: None,
        })
    }

    fn after_event(&mut self, event: Option<&OrderEvent>) {
        match event {
            Some(OrderEvent::Opened {
                order_id,
                price,
                quantity,
            }) => {
                self.trailing.on_position_opened(*price);
                info!(
                    "BUY EXECUTED {}: {:.4} @ {:.4}, value {:.2}",
                    order_id,
                    quantity,
                    price,
                    quantity * price
                );
            }
            Some(OrderEvent::Closed {
                order_id,
                kind,
                entry_price,
                price,
                quantity,
            }) => {
                if let Some(stale) = self.trailing.on_position_closed() {
                    if stale.order_id != *order_id {
                        self.voided_stops.insert(stale.order_id);
                    }
                }
                info!(
                    "SELL EXECUTED {} ({}): {:.4} @ {:.4}, pnl {:.2}",
                    order_id,
                    kind,
                    quantity,
                    price,
                    quantity * (price - entry_price)
                );
            }
            Some(OrderEvent::NotExecuted {
                order_id,
                kind,
                status,
            }) => {
                warn!("order {} ({}) not executed: {}", order_id, kind, status);
            }
            None => {}
        }
    }
}
