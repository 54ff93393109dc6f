//! Trade simulator.
//!
//! A single-ticker {Flat, Long} state machine. Bars are processed strictly in
//! date order; on each bar the equity is marked at the close first, then the
//! bar's signal is applied:
//!
//! - Flat + BUY: buy with all cash at the close (after slippage and
//!   commission), open a pending trade.
//! - Long + SELL: sell the whole position at the close, book the trade.
//! - Anything else: no change.
//!
//! A position still open after the last bar stays open. It is valued in the
//! equity curve and returned as `open_trade`, but it is not a closed trade and
//! does not count toward `trade_count` or `win_rate`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::MarketsenseError;
use super::execution::{enter_long, exit_long, EntryResult, ExecutionCosts};
use super::metrics::PerformanceReport;
use super::ohlcv::PriceSeries;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{OpenTrade, Trade};
use super::signal::{Action, Signal};
use super::strategy::StrategyConfig;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000_000.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.035;
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub transaction_cost_rate: f64,
    pub slippage_rate: f64,
    pub risk_free_rate: f64,
    pub trading_days_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            transaction_cost_rate: 0.0,
            slippage_rate: 0.0,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

impl BacktestConfig {
    pub fn costs(&self) -> ExecutionCosts {
        ExecutionCosts {
            transaction_cost_rate: self.transaction_cost_rate,
            slippage_rate: self.slippage_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub ticker: String,
    pub strategy: String,
    pub report: PerformanceReport,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub open_trade: Option<OpenTrade>,
}

/// Replay `signals` over `series`. Signals are matched to bars by position.
pub fn simulate(series: &PriceSeries, signals: &[Signal], config: &BacktestConfig) -> Portfolio {
    let costs = config.costs();
    let mut portfolio = Portfolio::new(config.initial_capital);

    for (bar, signal) in series.bars.iter().zip(signals) {
        portfolio.record_equity(bar.date, bar.close);

        match (portfolio.is_long(), signal.action) {
            (false, Action::Buy) => {
                if let EntryResult::Entered {
                    quantity,
                    fill_price,
                    ..
                } = enter_long(&mut portfolio, bar.date, bar.close, &costs)
                {
                    debug!(date = %bar.date, quantity, fill_price, "entered long");
                }
            }
            (true, Action::Sell) => {
                if let Some(trade) = exit_long(&mut portfolio, bar.date, bar.close, &costs) {
                    debug!(date = %bar.date, pnl = trade.realized_pnl, "closed trade");
                }
            }
            _ => {}
        }
    }

    portfolio
}

/// Generate signals for `strategy`, simulate them and reduce to metrics.
pub fn run_backtest(
    series: &PriceSeries,
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> Result<BacktestResult, MarketsenseError> {
    super::config::validate_backtest_config(config)?;
    series.validate()?;

    let minimum = strategy.min_lookback();
    if series.len() < minimum {
        return Err(MarketsenseError::InsufficientData {
            ticker: series.ticker.clone(),
            strategy: strategy.to_string(),
            bars: series.len(),
            minimum,
        });
    }

    let signals = strategy.generate(series)?;
    let portfolio = simulate(series, &signals, config);
    let report = PerformanceReport::compute(
        &portfolio.equity_curve,
        &portfolio.trades,
        config.trading_days_per_year,
        config.risk_free_rate,
    );

    info!(
        ticker = %series.ticker,
        strategy = %strategy,
        bars = series.len(),
        total_return = report.total_return,
        trades = report.trade_count,
        "backtest complete"
    );

    Ok(BacktestResult {
        ticker: series.ticker.clone(),
        strategy: strategy.to_string(),
        report,
        trades: portfolio.trades,
        equity_curve: portfolio.equity_curve,
        open_trade: portfolio.open_trade,
    })
}

/// Independent per-ticker runs on the rayon pool, returned in input order.
pub fn run_backtests(
    series: &[PriceSeries],
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> Vec<Result<BacktestResult, MarketsenseError>> {
    series
        .par_iter()
        .map(|s| run_backtest(s, strategy, config))
        .collect()
}

#[derive(Debug)]
pub struct StrategyOutcome {
    pub strategy: StrategyConfig,
    pub result: Result<BacktestResult, MarketsenseError>,
}

impl StrategyOutcome {
    fn total_return(&self) -> Option<f64> {
        self.result.as_ref().ok().map(|r| r.report.total_return)
    }
}

/// Run several strategies over one series, best total return first.
/// Failed runs keep their error and sort last.
pub fn compare_strategies(
    series: &PriceSeries,
    strategies: &[StrategyConfig],
    config: &BacktestConfig,
) -> Vec<StrategyOutcome> {
    let mut outcomes: Vec<StrategyOutcome> = strategies
        .par_iter()
        .map(|strategy| StrategyOutcome {
            strategy: strategy.clone(),
            result: run_backtest(series, strategy, config),
        })
        .collect();

    outcomes.sort_by(|a, b| match (a.total_return(), b.total_return()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    outcomes
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub benchmark: String,
    pub benchmark_return: f64,
    pub alpha: f64,
}

/// Excess of `report`'s total return over buy-and-hold of `benchmark`.
pub fn benchmark_comparison(
    report: &PerformanceReport,
    benchmark: &PriceSeries,
) -> Result<BenchmarkComparison, MarketsenseError> {
    benchmark.validate()?;
    let (first, last) = match (benchmark.bars.first(), benchmark.bars.last()) {
        (Some(first), Some(last)) => (first.close, last.close),
        _ => {
            return Err(MarketsenseError::InsufficientData {
                ticker: benchmark.ticker.clone(),
                strategy: StrategyConfig::BuyAndHold.to_string(),
                bars: 0,
                minimum: 1,
            })
        }
    };
    let benchmark_return = last / first - 1.0;
    Ok(BenchmarkComparison {
        benchmark: benchmark.ticker.clone(),
        benchmark_return,
        alpha: report.total_return - benchmark_return,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::series_from_closes;
    use approx::assert_relative_eq;

    fn frictionless() -> BacktestConfig {
        BacktestConfig {
            initial_capital: 1_000.0,
            ..BacktestConfig::default()
        }
    }

    fn signals_for(series: &PriceSeries, actions: &[Action]) -> Vec<Signal> {
        series
            .bars
            .iter()
            .zip(actions)
            .map(|(bar, action)| Signal::new(bar.date, *action))
            .collect()
    }

    #[test]
    fn default_config_values() {
        let c = BacktestConfig::default();
        assert_eq!(c.initial_capital, 10_000_000.0);
        assert_eq!(c.transaction_cost_rate, 0.0);
        assert_eq!(c.slippage_rate, 0.0);
        assert_eq!(c.risk_free_rate, 0.035);
        assert_eq!(c.trading_days_per_year, 252.0);
    }

    #[test]
    fn equity_curve_covers_every_bar() {
        use Action::*;
        let series = series_from_closes(&[10.0, 11.0, 12.0, 9.0, 10.0]);
        let signals = signals_for(&series, &[Hold, Buy, Hold, Sell, Hold]);
        let portfolio = simulate(&series, &signals, &frictionless());

        let values: Vec<f64> = portfolio.equity_curve.iter().map(|p| p.total_value).collect();
        assert_eq!(values.len(), 5);
        assert_relative_eq!(values[0], 1_000.0);
        assert_relative_eq!(values[1], 1_000.0);
        assert_relative_eq!(values[2], 1_000.0 / 11.0 * 12.0);
        assert_relative_eq!(values[3], 1_000.0 / 11.0 * 9.0);
        assert_relative_eq!(values[4], 1_000.0 / 11.0 * 9.0);
        assert_eq!(portfolio.trades.len(), 1);
        assert!(portfolio.trades[0].realized_pnl < 0.0);
    }

    #[test]
    fn inapplicable_signals_are_ignored() {
        use Action::*;
        let series = series_from_closes(&[10.0, 11.0, 12.0, 13.0]);
        let signals = signals_for(&series, &[Sell, Buy, Buy, Hold]);
        let portfolio = simulate(&series, &signals, &frictionless());
        assert!(portfolio.trades.is_empty());
        let open = portfolio.open_trade.unwrap();
        assert_eq!(open.entry_date, series.bars[1].date);
    }

    #[test]
    fn open_trailing_position_is_not_a_trade() {
        let series = series_from_closes(&[10.0, 12.0, 15.0]);
        let result = run_backtest(&series, &StrategyConfig::BuyAndHold, &frictionless()).unwrap();

        assert_eq!(result.report.trade_count, 0);
        assert_eq!(result.report.win_rate, 0.0);
        assert!(result.trades.is_empty());
        assert!(result.open_trade.is_some());
        assert_relative_eq!(result.report.total_return, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn buy_and_hold_return_ignores_path() {
        let series = series_from_closes(&[20.0, 5.0, 80.0, 11.0, 30.0]);
        let result =
            run_backtest(&series, &StrategyConfig::BuyAndHold, &BacktestConfig::default()).unwrap();
        assert_relative_eq!(result.report.total_return, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn short_series_is_insufficient_data() {
        let series = series_from_closes(&[10.0; 10]);
        let rsi = StrategyConfig::with_defaults("rsi").unwrap();
        match run_backtest(&series, &rsi, &frictionless()) {
            Err(MarketsenseError::InsufficientData { bars, minimum, .. }) => {
                assert_eq!(bars, 10);
                assert_eq!(minimum, 15);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn non_positive_close_is_invalid_price() {
        let series = series_from_closes(&[10.0, 0.0, 12.0]);
        assert!(matches!(
            run_backtest(&series, &StrategyConfig::BuyAndHold, &frictionless()),
            Err(MarketsenseError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn costs_reduce_round_trip() {
        use Action::*;
        let series = series_from_closes(&[10.0, 10.0, 10.0]);
        let signals = signals_for(&series, &[Buy, Sell, Hold]);
        let config = BacktestConfig {
            transaction_cost_rate: 0.0015,
            slippage_rate: 0.0005,
            ..frictionless()
        };
        let portfolio = simulate(&series, &signals, &config);
        assert!(portfolio.cash < 1_000.0);
        assert!(portfolio.trades[0].realized_pnl < 0.0);
        // marked before the sell, so the curve reflects the entry cost on bar 1
        assert!(portfolio.equity_curve[1].total_value < 1_000.0);
    }

    #[test]
    fn run_backtests_keeps_input_order() {
        let a = PriceSeries::new("A", series_from_closes(&[10.0, 20.0]).bars);
        let b = PriceSeries::new("B", series_from_closes(&[10.0, 5.0]).bars);
        let empty = PriceSeries::new("C", vec![]);
        let results = run_backtests(&[a, b, empty], &StrategyConfig::BuyAndHold, &frictionless());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().ticker, "A");
        assert_eq!(results[1].as_ref().unwrap().ticker, "B");
        assert!(matches!(
            results[2],
            Err(MarketsenseError::InsufficientData { .. })
        ));
    }

    #[test]
    fn compare_orders_by_total_return() {
        let series = series_from_closes(&[10.0, 11.0, 9.0, 12.0, 8.0, 14.0]);
        let strategies = vec![
            StrategyConfig::Momentum { window: 1 },
            StrategyConfig::BuyAndHold,
            StrategyConfig::with_defaults("rsi").unwrap(),
        ];
        let outcomes = compare_strategies(&series, &strategies, &frictionless());

        assert_eq!(outcomes.len(), 3);
        let returns: Vec<f64> = outcomes.iter().filter_map(|o| o.total_return()).collect();
        assert_eq!(returns.len(), 2);
        assert!(returns[0] >= returns[1]);
        assert!(outcomes[2].result.is_err());
        assert_eq!(outcomes[2].strategy.key(), "rsi");
    }

    #[test]
    fn benchmark_alpha() {
        let series = series_from_closes(&[10.0, 15.0]);
        let result = run_backtest(&series, &StrategyConfig::BuyAndHold, &frictionless()).unwrap();
        let benchmark = PriceSeries::new("KOSPI", series_from_closes(&[100.0, 120.0]).bars);

        let cmp = benchmark_comparison(&result.report, &benchmark).unwrap();
        assert_eq!(cmp.benchmark, "KOSPI");
        assert_relative_eq!(cmp.benchmark_return, 0.2, epsilon = 1e-12);
        assert_relative_eq!(cmp.alpha, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn benchmark_requires_bars() {
        let report = PerformanceReport::compute(&[], &[], 252.0, 0.0);
        assert!(benchmark_comparison(&report, &PriceSeries::new("X", vec![])).is_err());
    }
}
