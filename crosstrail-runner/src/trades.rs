//! Round-trip trade records, built from the broker's fill log.

use chrono::NaiveDateTime;
use crosstrail_core::domain::{OrderKind, OrderId};
use serde::{Deserialize, Serialize};

use crate::broker::FillRecord;

/// One completed entry → exit round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_order: OrderId,
    pub exit_order: OrderId,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    /// Exit or trailing stop.
    pub exit_kind: OrderKind,
    /// Both legs' commission.
    pub commission: f64,
    /// Net of commission.
    pub pnl: f64,
    /// Net pnl over entry cost.
    pub return_pct: f64,
    pub bars_held: usize,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Pair each entry fill with the exit fill that follows it.
///
/// `timestamps` is the bar clock, used to count bars held. An entry with no
/// exit yet is still open and produces no record.
pub fn extract_trades(fills: &[FillRecord], timestamps: &[NaiveDateTime]) -> Vec<TradeRecord> {
    let bar_index = |t: NaiveDateTime| timestamps.partition_point(|&ts| ts < t);

    let mut trades = Vec::new();
    let mut open: Option<&FillRecord> = None;
    for fill in fills {
        match (fill.kind, open) {
            (OrderKind::Entry, _) => open = Some(fill),
            (OrderKind::Exit | OrderKind::TrailingStop, Some(entry)) => {
                let cost = entry.price * fill.quantity;
                let commission = entry.commission + fill.commission;
                let pnl = (fill.price - entry.price) * fill.quantity - commission;
                trades.push(TradeRecord {
                    entry_order: entry.order_id,
                    exit_order: fill.order_id,
                    entry_time: entry.timestamp,
                    exit_time: fill.timestamp,
                    entry_price: entry.price,
                    exit_price: fill.price,
                    quantity: fill.quantity,
                    exit_kind: fill.kind,
                    commission,
                    pnl,
                    return_pct: if cost > 0.0 { pnl / cost } else { 0.0 },
                    bars_held: bar_index(fill.timestamp).saturating_sub(bar_index(entry.timestamp)),
                });
                open = None;
            }
            (_, None) => {}
        }
    }
    trades
}
