//! Order lifecycle tracker: the single entry/exit slot and the position it governs.
//!
//! States: Idle → Pending → {Filled, Canceled, Rejected} → Idle.
//!
//! - Idle: no outstanding order; an entry or exit request moves to Pending.
//! - Pending: every further entry/exit request is refused until a terminal
//!   notification arrives.
//! - Completed: the fill opens or closes the position, back to Idle.
//! - Canceled/Rejected: the order is dropped with no position effect and
//!   surfaced as `OrderEvent::NotExecuted`. Nothing is retried here.
//!
//! Trailing stops live in their own slot (`TrailingStopManager`); their fills
//! close the position through `close_by_stop`.
//!
//! One tracker per traded instrument. It holds no shared state.

use crate::domain::{
    Fill, OrderId, OrderKind, OrderNotification, OrderStatus, PendingOrder, Position,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from tracker operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("order {working} is still working; new {requested} request refused")]
    OrderAlreadyWorking {
        working: OrderId,
        requested: OrderKind,
    },

    #[error("entry refused: a position is already open")]
    PositionAlreadyOpen,

    #[error("{0} refused: no open position")]
    NoOpenPosition(OrderKind),

    #[error("invalid quantity {0} for {1} order")]
    InvalidQuantity(f64, OrderKind),

    #[error("{0} orders are not tracked in the entry/exit slot")]
    WrongSlot(OrderKind),

    #[error("order {0} is not tracked")]
    UnknownOrder(OrderId),

    #[error("order {0}: invalid transition {1} → {2}")]
    InvalidTransition(OrderId, OrderStatus, OrderStatus),
}

/// Coarse tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerState {
    Idle,
    Pending,
}

/// What a terminal notification did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
    /// Entry filled; the position is now open.
    Opened {
        order_id: OrderId,
        price: f64,
        quantity: f64,
    },
    /// Exit or trailing stop filled; the position is now flat.
    Closed {
        order_id: OrderId,
        kind: OrderKind,
        entry_price: f64,
        price: f64,
        quantity: f64,
    },
    /// Canceled or rejected; no position effect.
    NotExecuted {
        order_id: OrderId,
        kind: OrderKind,
        status: OrderStatus,
    },
}

/// Audit trail entry for an order state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAuditEntry {
    pub order_id: OrderId,
    pub kind: OrderKind,
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
}

#[derive(Debug, Clone, Default)]
pub struct OrderLifecycleTracker {
    pending: Option<PendingOrder>,
    position: Position,
    audit_trail: Vec<OrderAuditEntry>,
}

impl OrderLifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackerState {
        if self.pending.is_some() {
            TrackerState::Pending
        } else {
            TrackerState::Idle
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingOrder> {
        self.pending.as_ref()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn owns(&self, order_id: OrderId) -> bool {
        self.pending.as_ref().is_some_and(|p| p.id == order_id)
    }

    pub fn audit_trail(&self) -> &[OrderAuditEntry] {
        &self.audit_trail
    }

    /// Claim the slot for an entry or exit order.
    pub fn request(
        &mut self,
        order_id: OrderId,
        kind: OrderKind,
        quantity: f64,
    ) -> Result<&PendingOrder, TrackerError> {
        if let Some(working) = &self.pending {
            return Err(TrackerError::OrderAlreadyWorking {
                working: working.id,
                requested: kind,
            });
        }
        match kind {
            OrderKind::Entry if self.position.is_open() => {
                return Err(TrackerError::PositionAlreadyOpen)
            }
            OrderKind::Exit if !self.position.is_open() => {
                return Err(TrackerError::NoOpenPosition(kind))
            }
            OrderKind::TrailingStop => return Err(TrackerError::WrongSlot(kind)),
            _ => {}
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(TrackerError::InvalidQuantity(quantity, kind));
        }

        self.audit_trail.push(OrderAuditEntry {
            order_id,
            kind,
            from_status: None,
            to_status: OrderStatus::Submitted,
        });
        Ok(&*self.pending.insert(PendingOrder {
            id: order_id,
            kind,
            requested_quantity: quantity,
            status: OrderStatus::Submitted,
        }))
    }

    /// Apply a venue notification for the pending order.
    ///
    /// `fallback_price` prices a `Completed` notification that carries no fill
    /// details. Returns `Ok(None)` for non-terminal updates.
    pub fn on_status(
        &mut self,
        notification: &OrderNotification,
        fallback_price: f64,
        at: Option<NaiveDateTime>,
    ) -> Result<Option<OrderEvent>, TrackerError> {
        let order_id = notification.order_id;
        let pending = self
            .pending
            .as_mut()
            .filter(|p| p.id == order_id)
            .ok_or(TrackerError::UnknownOrder(order_id))?;

        let from = pending.status;
        let to = notification.status;
        if !is_valid_transition(from, to) {
            return Err(TrackerError::InvalidTransition(order_id, from, to));
        }
        pending.status = to;
        let kind = pending.kind;
        self.audit_trail.push(OrderAuditEntry {
            order_id,
            kind,
            from_status: Some(from),
            to_status: to,
        });

        if !to.is_terminal() {
            return Ok(None);
        }

        // Terminal: the slot is free again whatever happens below.
        let Some(order) = self.pending.take() else {
            return Err(TrackerError::UnknownOrder(order_id));
        };

        match to {
            OrderStatus::Completed => {
                let fill = resolve_fill(notification.fill, order.requested_quantity, fallback_price);
                match order.kind {
                    OrderKind::Entry => {
                        self.position = Position::open(fill.quantity, fill.price, at);
                        Ok(Some(OrderEvent::Opened {
                            order_id,
                            price: fill.price,
                            quantity: fill.quantity,
                        }))
                    }
                    kind => self.close_position(order_id, kind, fill).map(Some),
                }
            }
            _ => Ok(Some(OrderEvent::NotExecuted {
                order_id,
                kind: order.kind,
                status: to,
            })),
        }
    }

    /// Close the position on a trailing-stop fill.
    pub fn close_by_stop(
        &mut self,
        order_id: OrderId,
        fill: Option<Fill>,
        fallback_price: f64,
    ) -> Result<OrderEvent, TrackerError> {
        if !self.position.is_open() {
            return Err(TrackerError::NoOpenPosition(OrderKind::TrailingStop));
        }
        let fill = resolve_fill(fill, self.position.quantity, fallback_price);
        self.audit_trail.push(OrderAuditEntry {
            order_id,
            kind: OrderKind::TrailingStop,
            from_status: None,
            to_status: OrderStatus::Completed,
        });
        self.close_position(order_id, OrderKind::TrailingStop, fill)
    }

    fn close_position(
        &mut self,
        order_id: OrderId,
        kind: OrderKind,
        fill: Fill,
    ) -> Result<OrderEvent, TrackerError> {
        if !self.position.is_open() {
            return Err(TrackerError::NoOpenPosition(kind));
        }
        let closed = std::mem::take(&mut self.position);
        Ok(OrderEvent::Closed {
            order_id,
            kind,
            entry_price: closed.entry_price,
            price: fill.price,
            quantity: closed.quantity,
        })
    }
}

fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (_, Submitted) => from == Submitted,
        (Submitted, Accepted) => true,
        (Accepted, Accepted) => true,
        (Submitted | Accepted, Completed | Canceled | Rejected) => true,
        _ => false,
    }
}

fn resolve_fill(fill: Option<Fill>, requested_quantity: f64, fallback_price: f64) -> Fill {
    match fill {
        Some(f) if f.quantity > 0.0 && f.price > 0.0 => f,
        Some(f) if f.price > 0.0 => Fill {
            price: f.price,
            quantity: requested_quantity,
        },
        _ => Fill {
            price: fallback_price,
            quantity: requested_quantity,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_long(tracker: &mut OrderLifecycleTracker) {
        tracker.request(OrderId(1), OrderKind::Entry, 10.0).unwrap();
        tracker
            .on_status(&OrderNotification::completed(OrderId(1), 100.0, 10.0), 0.0, None)
            .unwrap();
    }

    #[test]
    fn starts_idle_and_flat() {
        let tracker = OrderLifecycleTracker::new();
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(!tracker.position().is_open());
    }

    #[test]
    fn entry_request_moves_to_pending() {
        let mut tracker = OrderLifecycleTracker::new();
        let pending = tracker.request(OrderId(1), OrderKind::Entry, 33.3).unwrap();
        assert_eq!(pending.status, OrderStatus::Submitted);
        assert_eq!(tracker.state(), TrackerState::Pending);
        assert!(tracker.owns(OrderId(1)));
    }

    #[test]
    fn second_request_while_pending_is_refused() {
        let mut tracker = OrderLifecycleTracker::new();
        tracker.request(OrderId(1), OrderKind::Entry, 10.0).unwrap();
        let err = tracker.request(OrderId(2), OrderKind::Entry, 10.0).unwrap_err();
        assert_eq!(
            err,
            TrackerError::OrderAlreadyWorking {
                working: OrderId(1),
                requested: OrderKind::Entry
            }
        );
    }

    #[test]
    fn completed_entry_opens_position_and_returns_to_idle() {
        let mut tracker = OrderLifecycleTracker::new();
        tracker.request(OrderId(1), OrderKind::Entry, 10.0).unwrap();
        assert_eq!(
            tracker
                .on_status(&OrderNotification::status(OrderId(1), OrderStatus::Accepted), 0.0, None)
                .unwrap(),
            None
        );
        let event = tracker
            .on_status(&OrderNotification::completed(OrderId(1), 101.0, 10.0), 0.0, None)
            .unwrap();
        assert_eq!(
            event,
            Some(OrderEvent::Opened {
                order_id: OrderId(1),
                price: 101.0,
                quantity: 10.0
            })
        );
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(tracker.position().is_open());
        assert_eq!(tracker.position().entry_price, 101.0);
    }

    #[test]
    fn rejected_entry_leaves_position_flat() {
        let mut tracker = OrderLifecycleTracker::new();
        tracker.request(OrderId(1), OrderKind::Entry, 10.0).unwrap();
        let event = tracker
            .on_status(&OrderNotification::status(OrderId(1), OrderStatus::Rejected), 0.0, None)
            .unwrap();
        assert_eq!(
            event,
            Some(OrderEvent::NotExecuted {
                order_id: OrderId(1),
                kind: OrderKind::Entry,
                status: OrderStatus::Rejected
            })
        );
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(!tracker.position().is_open());
    }

    #[test]
    fn canceled_exit_keeps_position_open() {
        let mut tracker = OrderLifecycleTracker::new();
        open_long(&mut tracker);
        tracker.request(OrderId(2), OrderKind::Exit, 10.0).unwrap();
        tracker
            .on_status(&OrderNotification::status(OrderId(2), OrderStatus::Canceled), 0.0, None)
            .unwrap();
        assert!(tracker.position().is_open());
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn completed_exit_closes_position() {
        let mut tracker = OrderLifecycleTracker::new();
        open_long(&mut tracker);
        tracker.request(OrderId(2), OrderKind::Exit, 10.0).unwrap();
        let event = tracker
            .on_status(&OrderNotification::completed(OrderId(2), 110.0, 10.0), 0.0, None)
            .unwrap();
        assert_eq!(
            event,
            Some(OrderEvent::Closed {
                order_id: OrderId(2),
                kind: OrderKind::Exit,
                entry_price: 100.0,
                price: 110.0,
                quantity: 10.0
            })
        );
        assert!(!tracker.position().is_open());
    }

    #[test]
    fn completed_without_fill_uses_fallback_price() {
        let mut tracker = OrderLifecycleTracker::new();
        tracker.request(OrderId(1), OrderKind::Entry, 12.0).unwrap();
        tracker
            .on_status(&OrderNotification::status(OrderId(1), OrderStatus::Completed), 99.5, None)
            .unwrap();
        assert_eq!(tracker.position().quantity, 12.0);
        assert_eq!(tracker.position().entry_price, 99.5);
    }

    #[test]
    fn entry_refused_when_position_open() {
        let mut tracker = OrderLifecycleTracker::new();
        open_long(&mut tracker);
        assert_eq!(
            tracker.request(OrderId(2), OrderKind::Entry, 5.0).unwrap_err(),
            TrackerError::PositionAlreadyOpen
        );
    }

    #[test]
    fn exit_refused_when_flat() {
        let mut tracker = OrderLifecycleTracker::new();
        assert_eq!(
            tracker.request(OrderId(1), OrderKind::Exit, 5.0).unwrap_err(),
            TrackerError::NoOpenPosition(OrderKind::Exit)
        );
    }

    #[test]
    fn trailing_stop_not_accepted_in_slot() {
        let mut tracker = OrderLifecycleTracker::new();
        open_long(&mut tracker);
        assert_eq!(
            tracker
                .request(OrderId(2), OrderKind::TrailingStop, 10.0)
                .unwrap_err(),
            TrackerError::WrongSlot(OrderKind::TrailingStop)
        );
    }

    #[test]
    fn invalid_quantity_refused() {
        let mut tracker = OrderLifecycleTracker::new();
        assert!(tracker.request(OrderId(1), OrderKind::Entry, 0.0).is_err());
        assert!(tracker.request(OrderId(1), OrderKind::Entry, f64::NAN).is_err());
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn unknown_order_is_an_error() {
        let mut tracker = OrderLifecycleTracker::new();
        let err = tracker
            .on_status(&OrderNotification::status(OrderId(9), OrderStatus::Accepted), 0.0, None)
            .unwrap_err();
        assert_eq!(err, TrackerError::UnknownOrder(OrderId(9)));
    }

    #[test]
    fn accepted_cannot_regress_to_submitted() {
        let mut tracker = OrderLifecycleTracker::new();
        tracker.request(OrderId(1), OrderKind::Entry, 10.0).unwrap();
        tracker
            .on_status(&OrderNotification::status(OrderId(1), OrderStatus::Accepted), 0.0, None)
            .unwrap();
        let err = tracker
            .on_status(&OrderNotification::status(OrderId(1), OrderStatus::Submitted), 0.0, None)
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidTransition(..)));
        assert!(tracker.is_pending());
    }

    #[test]
    fn stop_fill_closes_position() {
        let mut tracker = OrderLifecycleTracker::new();
        open_long(&mut tracker);
        let event = tracker
            .close_by_stop(OrderId(7), Some(Fill { price: 97.0, quantity: 10.0 }), 0.0)
            .unwrap();
        assert!(matches!(
            event,
            OrderEvent::Closed {
                kind: OrderKind::TrailingStop,
                ..
            }
        ));
        assert!(!tracker.position().is_open());
        assert!(tracker.close_by_stop(OrderId(7), None, 97.0).is_err());
    }

    #[test]
    fn audit_trail_records_transitions() {
        let mut tracker = OrderLifecycleTracker::new();
        open_long(&mut tracker);
        let trail = tracker.audit_trail();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].from_status, None);
        assert_eq!(trail[1].to_status, OrderStatus::Completed);
    }
}
