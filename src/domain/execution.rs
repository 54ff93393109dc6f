//! Fill simulation: slippage on the fill price, proportional commission on
//! both legs. Fractional shares; every entry commits all available cash.

use chrono::NaiveDate;

use super::portfolio::Portfolio;
use super::position::{OpenTrade, Position, Trade};

/// Proportional trading costs, as fractions (0.0015 = 15 bp).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExecutionCosts {
    pub transaction_cost_rate: f64,
    pub slippage_rate: f64,
}

/// Buy fill: price moves against the buyer.
pub fn buy_fill_price(close: f64, slippage_rate: f64) -> f64 {
    close * (1.0 + slippage_rate)
}

/// Sell fill: price moves against the seller.
pub fn sell_fill_price(close: f64, slippage_rate: f64) -> f64 {
    close * (1.0 - slippage_rate)
}

pub fn commission(trade_value: f64, transaction_cost_rate: f64) -> f64 {
    trade_value * transaction_cost_rate
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered { quantity: f64, fill_price: f64, commission: f64 },
    AlreadyLong,
    InsufficientCapital,
}

/// Spend all cash on the position, net of commission.
pub fn enter_long(
    portfolio: &mut Portfolio,
    date: NaiveDate,
    close: f64,
    costs: &ExecutionCosts,
) -> EntryResult {
    if portfolio.position.is_some() {
        return EntryResult::AlreadyLong;
    }
    let budget = portfolio.cash;
    let fill_price = buy_fill_price(close, costs.slippage_rate);
    if !(budget > 0.0 && fill_price > 0.0) {
        return EntryResult::InsufficientCapital;
    }

    let quantity = budget / (fill_price * (1.0 + costs.transaction_cost_rate));
    let fee = commission(quantity * fill_price, costs.transaction_cost_rate);

    portfolio.cash = 0.0;
    portfolio.position = Some(Position {
        quantity,
        average_cost: budget / quantity,
    });
    portfolio.open_trade = Some(OpenTrade {
        entry_date: date,
        entry_price: fill_price,
        quantity,
        entry_cost: budget,
    });

    EntryResult::Entered {
        quantity,
        fill_price,
        commission: fee,
    }
}

/// Sell the whole position and book the round trip. `None` when flat.
pub fn exit_long(
    portfolio: &mut Portfolio,
    date: NaiveDate,
    close: f64,
    costs: &ExecutionCosts,
) -> Option<Trade> {
    let position = portfolio.position.take()?;
    let open = portfolio.open_trade.take()?;

    let fill_price = sell_fill_price(close, costs.slippage_rate);
    let gross = position.quantity * fill_price;
    let proceeds = gross - commission(gross, costs.transaction_cost_rate);

    portfolio.cash += proceeds;
    let trade = open.close(date, fill_price, proceeds);
    portfolio.record_trade(trade.clone());
    Some(trade)
}
