//! Performance metrics: one deterministic reduction of an equity curve and
//! its trade ledger.

use serde::{Deserialize, Serialize};

use super::ohlcv::log_returns;
use super::portfolio::EquityPoint;
use super::position::Trade;

/// Volatility at or below this is treated as flat.
const ZERO_VOLATILITY: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub trade_count: usize,
}

impl PerformanceReport {
    /// `trades` holds closed round trips only; an open trailing position is
    /// reflected in the equity curve but never counted here.
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        trading_days_per_year: f64,
        risk_free_rate: f64,
    ) -> Self {
        let values: Vec<f64> = equity_curve.iter().map(|p| p.total_value).collect();

        let total_return = match (values.first(), values.last()) {
            (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
            _ => 0.0,
        };

        let bars = values.len() as f64;
        let annualized_return = if bars > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(trading_days_per_year / bars) - 1.0
        } else if total_return <= -1.0 {
            -1.0
        } else {
            0.0
        };

        let volatility = sample_std(&log_returns(&values)) * trading_days_per_year.sqrt();
        let sharpe_ratio = sharpe_ratio(annualized_return, volatility, risk_free_rate);

        let trade_count = trades.len();
        let wins = trades.iter().filter(|t| t.is_win()).count();
        let win_rate = if trade_count > 0 {
            wins as f64 / trade_count as f64
        } else {
            0.0
        };

        PerformanceReport {
            total_return,
            annualized_return,
            volatility,
            sharpe_ratio,
            max_drawdown: max_drawdown(&values),
            win_rate,
            trade_count,
        }
    }
}

/// (return − risk_free) / volatility, 0 for a flat curve.
pub fn sharpe_ratio(annualized_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility > ZERO_VOLATILITY && volatility.is_finite() {
        (annualized_return - risk_free_rate) / volatility
    } else {
        0.0
    }
}

/// Sample standard deviation (n − 1). 0 with fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Worst value / running peak − 1, as a non-positive fraction.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            worst = worst.min(v / peak - 1.0);
        }
    }
    worst
}
