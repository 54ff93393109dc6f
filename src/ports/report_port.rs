//! Report output port trait.

use crate::domain::backtest::{BacktestResult, BenchmarkComparison, StrategyOutcome};
use crate::domain::error::MarketsenseError;
use crate::domain::frontier::EfficientFrontier;
use crate::domain::optimizer::OptimizationResult;
use serde::Serialize;

/// A backtest result with the optional benchmark comparison attached.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport<'a> {
    #[serde(flatten)]
    pub result: &'a BacktestResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<&'a BenchmarkComparison>,
}

/// An optimization result with its estimation context and optional frontier.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport<'a> {
    pub tickers: &'a [String],
    pub lookback_days: usize,
    pub risk_free_rate: f64,
    #[serde(flatten)]
    pub result: &'a OptimizationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontier: Option<&'a EfficientFrontier>,
}

/// Port for writing run results.
pub trait ReportPort {
    fn write_backtests(&self, reports: &[BacktestReport<'_>]) -> Result<(), MarketsenseError>;

    fn write_comparison(&self, outcomes: &[StrategyOutcome]) -> Result<(), MarketsenseError>;

    fn write_optimization(&self, report: &OptimizationReport<'_>) -> Result<(), MarketsenseError>;
}
