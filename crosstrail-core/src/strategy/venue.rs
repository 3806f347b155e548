//! The execution venue seam: where order requests go and equity comes from.

use crate::domain::OrderRequest;

/// External execution collaborator.
///
/// The venue matches and fills orders, charges commission, and reports back
/// through `CrossoverStrategy::on_order_status` between bars. The strategy
/// never computes fill prices itself.
pub trait ExecutionVenue {
    /// Current account value. Queried once per entry-sizing decision.
    fn equity(&self) -> f64;

    /// Hand an order to the venue.
    fn submit(&mut self, request: &OrderRequest);
}

/// Venue that records requests and reports a fixed equity. Useful for
/// driving the strategy by hand.
#[derive(Debug, Clone, Default)]
pub struct RecordingVenue {
    pub equity: f64,
    pub submitted: Vec<OrderRequest>,
}

impl RecordingVenue {
    pub fn with_equity(equity: f64) -> Self {
        Self {
            equity,
            submitted: Vec::new(),
        }
    }
}

impl ExecutionVenue for RecordingVenue {
    fn equity(&self) -> f64 {
        self.equity
    }

    fn submit(&mut self, request: &OrderRequest) {
        self.submitted.push(request.clone());
    }
}
