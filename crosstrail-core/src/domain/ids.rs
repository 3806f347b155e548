use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID, assigned by the strategy when it requests an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Monotonic order ID source. One per strategy instance.
#[derive(Debug, Clone, Default)]
pub struct OrderIdGen {
    next: u64,
}

impl OrderIdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> OrderId {
        if self.next == 0 {
            self.next = 1;
        }
        let id = OrderId(self.next);
        self.next += 1;
        id
    }
}
