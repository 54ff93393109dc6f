//! Per-bar trading decisions emitted by strategies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// One decision per bar. HOLD is an explicit no-op, never an absent signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub date: NaiveDate,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight: Option<f64>,
}

impl Signal {
    pub fn new(date: NaiveDate, action: Action) -> Self {
        Signal {
            date,
            action,
            target_weight: None,
        }
    }

    pub fn hold(date: NaiveDate) -> Self {
        Self::new(date, Action::Hold)
    }

    pub fn with_target_weight(mut self, weight: f64) -> Self {
        self.target_weight = Some(weight);
        self
    }
}
