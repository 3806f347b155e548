//! Shared helpers: synthetic bars and a venue that settles at the close.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use crosstrail_core::domain::{Bar, OrderKind, OrderNotification, OrderRequest, OrderStatus};
use crosstrail_core::orders::OrderEvent;
use crosstrail_core::{BarReport, CrossoverStrategy, ExecutionVenue};

pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(i as i64)
}

pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: ts(i),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Linear legs: start price, then (bars, step) pairs.
pub fn piecewise(start: f64, legs: &[(usize, f64)]) -> Vec<f64> {
    let mut out = vec![start];
    let mut price = start;
    for &(n, step) in legs {
        for _ in 0..n {
            price += step;
            out.push(price);
        }
    }
    out
}

/// Venue that acknowledges every order and fills market orders at the close
/// of the bar they were requested on. Trailing stops fill when the close
/// reaches the strategy's own stop level.
#[derive(Debug, Default)]
pub struct CloseFillVenue {
    pub equity: f64,
    pub reject_entries: bool,
    pub submitted: Vec<OrderRequest>,
    inbox: Vec<OrderRequest>,
    working_stop: Option<OrderRequest>,
    /// Highest number of entry/exit orders outstanding at once.
    pub max_outstanding: usize,
    outstanding: usize,
}

impl CloseFillVenue {
    pub fn new(equity: f64) -> Self {
        Self {
            equity,
            ..Default::default()
        }
    }

    /// Deliver notifications for everything submitted so far.
    pub fn settle(&mut self, strategy: &mut CrossoverStrategy, close: f64) -> Vec<OrderEvent> {
        let mut events = Vec::new();
        let mut deliver = |s: &mut CrossoverStrategy, n: OrderNotification| {
            if let Some(e) = s.on_order_status(&n).unwrap() {
                events.push(e);
            }
        };

        for req in std::mem::take(&mut self.inbox) {
            deliver(strategy, OrderNotification::status(req.id, OrderStatus::Submitted));
            deliver(strategy, OrderNotification::status(req.id, OrderStatus::Accepted));
            match req.kind {
                OrderKind::TrailingStop => self.working_stop = Some(req),
                OrderKind::Entry if self.reject_entries => {
                    deliver(strategy, OrderNotification::status(req.id, OrderStatus::Rejected));
                    self.outstanding -= 1;
                }
                _ => {
                    deliver(
                        strategy,
                        OrderNotification::completed(req.id, close, req.quantity),
                    );
                    self.outstanding -= 1;
                }
            }
        }

        if let Some(stop) = self.working_stop.take() {
            if !strategy.position().is_open() {
                deliver(strategy, OrderNotification::status(stop.id, OrderStatus::Canceled));
            } else if strategy
                .trailing()
                .stop_price()
                .is_some_and(|level| close <= level)
            {
                deliver(
                    strategy,
                    OrderNotification::completed(stop.id, close, stop.quantity),
                );
            } else {
                self.working_stop = Some(stop);
            }
        }

        events
    }
}

impl ExecutionVenue for CloseFillVenue {
    fn equity(&self) -> f64 {
        self.equity
    }

    fn submit(&mut self, request: &OrderRequest) {
        if request.kind != OrderKind::TrailingStop {
            self.outstanding += 1;
            self.max_outstanding = self.max_outstanding.max(self.outstanding);
        }
        self.submitted.push(request.clone());
        self.inbox.push(request.clone());
    }
}

/// Run every bar through the strategy, settling after each one.
pub fn run(
    strategy: &mut CrossoverStrategy,
    venue: &mut CloseFillVenue,
    bars: &[Bar],
) -> (Vec<BarReport>, Vec<OrderEvent>) {
    let mut reports = Vec::new();
    let mut events = Vec::new();
    for bar in bars {
        reports.push(strategy.on_bar(bar, venue).unwrap());
        events.extend(venue.settle(strategy, bar.close));
    }
    (reports, events)
}
