//! Order requests, lifecycle statuses, and the notifications the execution
//! venue sends back.

use super::ids::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an order is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Opens the long position (market buy).
    Entry,
    /// Closes the long position on a death cross (market sell).
    Exit,
    /// Protective sell that trails the high-water mark by a fixed fraction.
    TrailingStop,
}

impl OrderKind {
    /// True for kinds that close a position when filled.
    pub fn is_exit(&self) -> bool {
        matches!(self, OrderKind::Exit | OrderKind::TrailingStop)
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderKind::Entry => "entry",
            OrderKind::Exit => "exit",
            OrderKind::TrailingStop => "trailing_stop",
        };
        f.write_str(s)
    }
}

/// Order lifecycle status as reported by the execution venue.
///
/// Notifications for one order arrive as Submitted → Accepted → terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitted,
    Accepted,
    Completed,
    Canceled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Canceled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Submitted => "submitted",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Error for an unrecognised status label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    /// Parses venue status labels. Margin calls collapse into `Rejected`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submitted" => Ok(OrderStatus::Submitted),
            "accepted" => Ok(OrderStatus::Accepted),
            "completed" | "filled" => Ok(OrderStatus::Completed),
            "canceled" | "cancelled" | "expired" => Ok(OrderStatus::Canceled),
            "rejected" | "margin" => Ok(OrderStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// An order the strategy hands to the execution venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub id: OrderId,
    pub kind: OrderKind,
    pub quantity: f64,
    /// Trail distance as a fraction, set only for `TrailingStop`.
    pub trail_fraction: Option<f64>,
}

/// The single in-flight entry/exit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: OrderId,
    pub kind: OrderKind,
    pub requested_quantity: f64,
    pub status: OrderStatus,
}

/// Execution details attached to a `Completed` notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
}

/// A status update delivered by the execution venue between bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderNotification {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub fill: Option<Fill>,
}

impl OrderNotification {
    pub fn status(order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            fill: None,
        }
    }

    pub fn completed(order_id: OrderId, price: f64, quantity: f64) -> Self {
        Self {
            order_id,
            status: OrderStatus::Completed,
            fill: Some(Fill { price, quantity }),
        }
    }
}
