//! Open position, pending trade and the closed-trade ledger entry.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Shares held. Long only: quantity is never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: f64,
    /// Cash spent per share, commission included.
    pub average_cost: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }
}

/// Entry leg of a trade that has not been closed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub quantity: f64,
    /// Total cash paid on entry, commission included.
    pub entry_cost: f64,
}

impl OpenTrade {
    pub fn close(self, exit_date: NaiveDate, exit_price: f64, exit_proceeds: f64) -> Trade {
        Trade {
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            exit_date,
            exit_price,
            quantity: self.quantity,
            realized_pnl: exit_proceeds - self.entry_cost,
        }
    }
}

/// Closed round trip. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub quantity: f64,
    pub realized_pnl: f64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.realized_pnl > 0.0
    }
}
