//! Simulated broker: the execution venue used by backtests.
//!
//! Matching rules:
//! - Entry and exit orders are market orders, filled at the next bar's open.
//! - An entry whose cost plus commission exceeds cash is rejected, as is an
//!   exit while the broker holds no position.
//! - A trailing stop keeps its own high-water mark, seeded at the last close
//!   when submitted and raised by each bar's high after matching. It triggers
//!   when a bar's low reaches `hwm * (1 - trail)` and fills at
//!   `min(open, stop)`, so a gap through the stop fills at the open.
//! - A working stop with no position left to protect is canceled.
//!
//! Market orders are matched before stops on each bar. Every fill pays
//! `commission * value`.

use chrono::NaiveDateTime;
use crosstrail_core::domain::{
    Bar, OrderId, OrderKind, OrderNotification, OrderRequest, OrderStatus,
};
use crosstrail_core::ExecutionVenue;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One executed fill, as the broker booked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    pub order_id: OrderId,
    pub kind: OrderKind,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub quantity: f64,
    pub commission: f64,
}

#[derive(Debug, Clone)]
struct WorkingStop {
    request: OrderRequest,
    high_water_mark: Option<f64>,
}

impl WorkingStop {
    fn stop_price(&self) -> Option<f64> {
        let trail = self.request.trail_fraction?;
        self.high_water_mark.map(|hwm| hwm * (1.0 - trail))
    }
}

#[derive(Debug, Clone)]
pub struct SimBroker {
    cash: f64,
    commission_rate: f64,
    position_qty: f64,
    last_price: Option<f64>,
    market_orders: Vec<OrderRequest>,
    stops: Vec<WorkingStop>,
    outbox: Vec<OrderNotification>,
    fills: Vec<FillRecord>,
}

impl SimBroker {
    pub fn new(initial_cash: f64, commission_rate: f64) -> Self {
        Self {
            cash: initial_cash,
            commission_rate,
            position_qty: 0.0,
            last_price: None,
            market_orders: Vec::new(),
            stops: Vec::new(),
            outbox: Vec::new(),
            fills: Vec::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position_quantity(&self) -> f64 {
        self.position_qty
    }

    pub fn fills(&self) -> &[FillRecord] {
        &self.fills
    }

    pub fn working_orders(&self) -> usize {
        self.market_orders.len() + self.stops.len()
    }

    /// Match working orders against a new bar. Notifications are queued for
    /// `drain_notifications`.
    pub fn on_bar_open(&mut self, bar: &Bar) {
        for request in std::mem::take(&mut self.market_orders) {
            self.match_market(&request, bar);
        }

        let stops = std::mem::take(&mut self.stops);
        for mut stop in stops {
            if self.position_qty <= 0.0 {
                debug!("{}: stop {} has no position, canceling", bar.timestamp, stop.request.id);
                self.outbox
                    .push(OrderNotification::status(stop.request.id, OrderStatus::Canceled));
                continue;
            }
            match stop.stop_price() {
                Some(stop_price) if bar.low <= stop_price => {
                    let price = bar.open.min(stop_price);
                    let quantity = stop.request.quantity.min(self.position_qty);
                    self.sell(&stop.request, bar.timestamp, price, quantity);
                }
                _ => {
                    let hwm = stop.high_water_mark.get_or_insert(bar.high);
                    if bar.high > *hwm {
                        *hwm = bar.high;
                    }
                    self.stops.push(stop);
                }
            }
        }
    }

    /// Record the bar's close for valuation and stop seeding.
    pub fn mark(&mut self, close: f64) {
        self.last_price = Some(close);
    }

    /// Take every notification queued since the last drain, in order.
    pub fn drain_notifications(&mut self) -> Vec<OrderNotification> {
        std::mem::take(&mut self.outbox)
    }

    fn commission(&self, value: f64) -> f64 {
        value.abs() * self.commission_rate
    }

    fn match_market(&mut self, request: &OrderRequest, bar: &Bar) {
        let price = bar.open;
        match request.kind {
            OrderKind::Entry => {
                let value = request.quantity * price;
                let commission = self.commission(value);
                if value + commission > self.cash {
                    warn!(
                        "{}: entry {} needs {:.2} but cash is {:.2}, rejecting",
                        bar.timestamp,
                        request.id,
                        value + commission,
                        self.cash
                    );
                    self.reject(request.id);
                    return;
                }
                self.cash -= value + commission;
                self.position_qty += request.quantity;
                self.book(request, bar.timestamp, price, request.quantity, commission);
            }
            OrderKind::Exit | OrderKind::TrailingStop => {
                if self.position_qty <= 0.0 {
                    warn!("{}: exit {} with no position, rejecting", bar.timestamp, request.id);
                    self.reject(request.id);
                    return;
                }
                let quantity = request.quantity.min(self.position_qty);
                self.sell(request, bar.timestamp, price, quantity);
            }
        }
    }

    fn sell(&mut self, request: &OrderRequest, at: NaiveDateTime, price: f64, quantity: f64) {
        let value = quantity * price;
        let commission = self.commission(value);
        self.cash += value - commission;
        self.position_qty -= quantity;
        if self.position_qty.abs() < 1e-12 {
            self.position_qty = 0.0;
        }
        self.book(request, at, price, quantity, commission);
    }

    fn book(
        &mut self,
        request: &OrderRequest,
        timestamp: NaiveDateTime,
        price: f64,
        quantity: f64,
        commission: f64,
    ) {
        debug!(
            "{}: filled {} ({}) {:.4} @ {:.4}, commission {:.2}",
            timestamp, request.id, request.kind, quantity, price, commission
        );
        self.fills.push(FillRecord {
            order_id: request.id,
            kind: request.kind,
            timestamp,
            price,
            quantity,
            commission,
        });
        self.outbox
            .push(OrderNotification::completed(request.id, price, quantity));
    }

    fn reject(&mut self, id: OrderId) {
        self.outbox
            .push(OrderNotification::status(id, OrderStatus::Rejected));
    }
}

impl ExecutionVenue for SimBroker {
    fn equity(&self) -> f64 {
        self.cash + self.position_qty * self.last_price.unwrap_or(0.0)
    }

    fn submit(&mut self, request: &OrderRequest) {
        self.outbox
            .push(OrderNotification::status(request.id, OrderStatus::Submitted));
        self.outbox
            .push(OrderNotification::status(request.id, OrderStatus::Accepted));
        match request.kind {
            OrderKind::TrailingStop => self.stops.push(WorkingStop {
                request: request.clone(),
                high_water_mark: self.last_price,
            }),
            OrderKind::Entry | OrderKind::Exit => self.market_orders.push(request.clone()),
        }
    }
}
