//! Order bookkeeping: the entry/exit slot with its position, and the trailing stop.

pub mod tracker;
pub mod trailing;

pub use tracker::{OrderAuditEntry, OrderEvent, OrderLifecycleTracker, TrackerError, TrackerState};
pub use trailing::{ArmedTrail, TrailOutcome, TrailingStopManager};
