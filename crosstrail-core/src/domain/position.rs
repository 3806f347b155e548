use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The strategy's single long position. Flat when `quantity == 0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: f64,
    pub entry_price: f64,
    pub opened_at: Option<NaiveDateTime>,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn open(quantity: f64, entry_price: f64, opened_at: Option<NaiveDateTime>) -> Self {
        debug_assert!(quantity > 0.0, "open position must have positive quantity");
        Self {
            quantity,
            entry_price,
            opened_at,
        }
    }

    pub fn is_open(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity * (current_price - self.entry_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_is_not_open() {
        assert!(!Position::flat().is_open());
    }

    #[test]
    fn open_position_valuation() {
        let pos = Position::open(10.0, 100.0, None);
        assert!(pos.is_open());
        assert_eq!(pos.market_value(110.0), 1100.0);
        assert_eq!(pos.unrealized_pnl(95.0), -50.0);
    }
}
