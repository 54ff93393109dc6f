//! Configuration building and validation.
//!
//! Every run parameter is checked here before a backtest or optimization
//! starts. INI values arrive through [`ConfigPort`]; numeric keys that are
//! present but unparsable are rejected rather than silently defaulted.

use std::path::PathBuf;

use chrono::NaiveDate;

use super::backtest::BacktestConfig;
use super::error::MarketsenseError;
use super::optimizer::{Objective, OptimizerConfig, WeightBounds, DEFAULT_LOOKBACK_DAYS};
use super::strategy::{CompositeParams, CompositeWeights, StrategyConfig};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_FRONTIER_POINTS: usize = 20;

pub fn validate_backtest_config(config: &BacktestConfig) -> Result<(), MarketsenseError> {
    if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
        return Err(MarketsenseError::config_invalid(
            "backtest",
            "initial_capital",
            format!("initial_capital must be positive, got {}", config.initial_capital),
        ));
    }
    validate_rate("transaction_cost_rate", config.transaction_cost_rate)?;
    validate_rate("slippage_rate", config.slippage_rate)?;
    validate_risk_free_rate("backtest", config.risk_free_rate)?;
    validate_trading_days("backtest", config.trading_days_per_year)
}

pub fn validate_optimizer_config(
    config: &OptimizerConfig,
    bounds: &WeightBounds,
) -> Result<(), MarketsenseError> {
    validate_risk_free_rate("optimizer", config.risk_free_rate)?;
    validate_trading_days("optimizer", config.trading_days_per_year)?;
    if config.sharpe_scan_points == 0 {
        return Err(MarketsenseError::config_invalid(
            "optimizer",
            "sharpe_scan_points",
            "sharpe_scan_points must be at least 1",
        ));
    }
    for (key, value) in [("min_weight", bounds.min_weight), ("max_weight", bounds.max_weight)] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(MarketsenseError::config_invalid(
                "optimizer",
                key,
                format!("{} must be between 0 and 1, got {}", key, value),
            ));
        }
    }
    if bounds.min_weight > bounds.max_weight {
        return Err(MarketsenseError::config_invalid(
            "optimizer",
            "min_weight",
            format!(
                "min_weight {} exceeds max_weight {}",
                bounds.min_weight, bounds.max_weight
            ),
        ));
    }
    Ok(())
}

fn validate_rate(key: &str, value: f64) -> Result<(), MarketsenseError> {
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        return Err(MarketsenseError::config_invalid(
            "backtest",
            key,
            format!("{} must be in [0, 1), got {}", key, value),
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(section: &str, value: f64) -> Result<(), MarketsenseError> {
    if !value.is_finite() || !(-1.0..1.0).contains(&value) {
        return Err(MarketsenseError::config_invalid(
            section,
            "risk_free_rate",
            format!("risk_free_rate must be between -1 and 1, got {}", value),
        ));
    }
    Ok(())
}

fn validate_trading_days(section: &str, value: f64) -> Result<(), MarketsenseError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(MarketsenseError::config_invalid(
            section,
            "trading_days_per_year",
            format!("trading_days_per_year must be positive, got {}", value),
        ));
    }
    Ok(())
}

/// Everything the binary needs to run one `backtest` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestJob {
    pub tickers: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub benchmark: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub strategy: StrategyConfig,
    pub config: BacktestConfig,
}

impl BacktestJob {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MarketsenseError> {
        let tickers = tickers(config, "backtest")?;
        let (start_date, end_date) = date_range(config, "backtest")?;
        let backtest = backtest_config(config)?;
        let strategy = StrategyConfig::from_config(config)?;
        Ok(BacktestJob {
            tickers,
            start_date,
            end_date,
            benchmark: non_empty(config.get_string("backtest", "benchmark")),
            data_dir: non_empty(config.get_string("backtest", "data_dir")).map(PathBuf::from),
            strategy,
            config: backtest,
        })
    }
}

/// Everything the binary needs to run one `optimize` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeJob {
    pub tickers: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub data_dir: Option<PathBuf>,
    pub objective: Objective,
    pub bounds: WeightBounds,
    pub lookback_days: usize,
    pub frontier_points: usize,
    pub config: OptimizerConfig,
}

impl OptimizeJob {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MarketsenseError> {
        let tickers = tickers(config, "optimizer")?;
        let (start_date, end_date) = date_range(config, "optimizer")?;
        let objective = match non_empty(config.get_string("optimizer", "objective")) {
            Some(s) => s.parse()?,
            None => Objective::MaxSharpe,
        };
        let defaults = WeightBounds::default();
        let bounds = WeightBounds {
            min_weight: read_f64(config, "optimizer", "min_weight", defaults.min_weight)?,
            max_weight: read_f64(config, "optimizer", "max_weight", defaults.max_weight)?,
        };
        let optimizer = optimizer_config(config)?;
        validate_optimizer_config(&optimizer, &bounds)?;

        let lookback_days = read_usize(config, "optimizer", "lookback_days", DEFAULT_LOOKBACK_DAYS)?;
        if lookback_days == 0 {
            return Err(MarketsenseError::config_invalid(
                "optimizer",
                "lookback_days",
                "lookback_days must be at least 1",
            ));
        }

        let data_dir = non_empty(config.get_string("optimizer", "data_dir"))
            .or_else(|| non_empty(config.get_string("backtest", "data_dir")))
            .map(PathBuf::from);

        Ok(OptimizeJob {
            tickers,
            start_date,
            end_date,
            data_dir,
            objective,
            bounds,
            lookback_days,
            frontier_points: read_usize(
                config,
                "optimizer",
                "frontier_points",
                DEFAULT_FRONTIER_POINTS,
            )?,
            config: optimizer,
        })
    }
}

/// `[backtest]` numeric settings over [`BacktestConfig::default`], validated.
pub fn backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, MarketsenseError> {
    let d = BacktestConfig::default();
    let built = BacktestConfig {
        initial_capital: read_f64(config, "backtest", "initial_capital", d.initial_capital)?,
        transaction_cost_rate: read_f64(
            config,
            "backtest",
            "transaction_cost_rate",
            d.transaction_cost_rate,
        )?,
        slippage_rate: read_f64(config, "backtest", "slippage_rate", d.slippage_rate)?,
        risk_free_rate: read_f64(config, "backtest", "risk_free_rate", d.risk_free_rate)?,
        trading_days_per_year: read_f64(
            config,
            "backtest",
            "trading_days_per_year",
            d.trading_days_per_year,
        )?,
    };
    validate_backtest_config(&built)?;
    Ok(built)
}

/// `[optimizer]` solver settings. Risk-free rate and trading days fall back
/// to `[backtest]` before the built-in defaults.
pub fn optimizer_config(config: &dyn ConfigPort) -> Result<OptimizerConfig, MarketsenseError> {
    let d = OptimizerConfig::default();
    let risk_free_rate = read_f64(config, "backtest", "risk_free_rate", d.risk_free_rate)?;
    let trading_days = read_f64(config, "backtest", "trading_days_per_year", d.trading_days_per_year)?;
    Ok(OptimizerConfig {
        risk_free_rate: read_f64(config, "optimizer", "risk_free_rate", risk_free_rate)?,
        trading_days_per_year: read_f64(config, "optimizer", "trading_days_per_year", trading_days)?,
        sharpe_scan_points: read_usize(config, "optimizer", "sharpe_scan_points", d.sharpe_scan_points)?,
    })
}

impl StrategyConfig {
    /// Build from `[strategy]`: `name` picks the variant, remaining keys
    /// override its conventional parameters.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MarketsenseError> {
        let name = non_empty(config.get_string("strategy", "name"))
            .ok_or_else(|| MarketsenseError::config_missing("strategy", "name"))?;
        let s = "strategy";
        let strategy = match StrategyConfig::with_defaults(&name)? {
            StrategyConfig::BuyAndHold => StrategyConfig::BuyAndHold,
            StrategyConfig::SmaCrossover { short, long } => StrategyConfig::SmaCrossover {
                short: read_usize(config, s, "short", short)?,
                long: read_usize(config, s, "long", long)?,
            },
            StrategyConfig::Rsi {
                period,
                oversold,
                overbought,
            } => StrategyConfig::Rsi {
                period: read_usize(config, s, "period", period)?,
                oversold: read_f64(config, s, "oversold", oversold)?,
                overbought: read_f64(config, s, "overbought", overbought)?,
            },
            StrategyConfig::Macd { fast, slow, signal } => StrategyConfig::Macd {
                fast: read_usize(config, s, "fast", fast)?,
                slow: read_usize(config, s, "slow", slow)?,
                signal: read_usize(config, s, "signal", signal)?,
            },
            StrategyConfig::BollingerBands { window, num_std } => StrategyConfig::BollingerBands {
                window: read_usize(config, s, "window", window)?,
                num_std: read_f64(config, s, "num_std", num_std)?,
            },
            StrategyConfig::Momentum { window } => StrategyConfig::Momentum {
                window: read_usize(config, s, "window", window)?,
            },
            StrategyConfig::CompositeScore(p) => {
                StrategyConfig::CompositeScore(composite_params(config, p)?)
            }
        };
        strategy.validate()?;
        Ok(strategy)
    }
}

fn composite_params(
    config: &dyn ConfigPort,
    p: CompositeParams,
) -> Result<CompositeParams, MarketsenseError> {
    let s = "strategy";
    let w = p.weights;
    Ok(CompositeParams {
        sma_short: read_usize(config, s, "sma_short", p.sma_short)?,
        sma_long: read_usize(config, s, "sma_long", p.sma_long)?,
        rsi_period: read_usize(config, s, "rsi_period", p.rsi_period)?,
        rsi_oversold: read_f64(config, s, "rsi_oversold", p.rsi_oversold)?,
        rsi_overbought: read_f64(config, s, "rsi_overbought", p.rsi_overbought)?,
        macd_fast: read_usize(config, s, "macd_fast", p.macd_fast)?,
        macd_slow: read_usize(config, s, "macd_slow", p.macd_slow)?,
        macd_signal: read_usize(config, s, "macd_signal", p.macd_signal)?,
        bb_window: read_usize(config, s, "bb_window", p.bb_window)?,
        bb_num_std: read_f64(config, s, "bb_num_std", p.bb_num_std)?,
        volume_window: read_usize(config, s, "volume_window", p.volume_window)?,
        volume_surge: read_f64(config, s, "volume_surge", p.volume_surge)?,
        weights: CompositeWeights {
            trend: read_f64(config, s, "weight_trend", w.trend)?,
            rsi: read_f64(config, s, "weight_rsi", w.rsi)?,
            macd: read_f64(config, s, "weight_macd", w.macd)?,
            bollinger: read_f64(config, s, "weight_bollinger", w.bollinger)?,
            volume: read_f64(config, s, "weight_volume", w.volume)?,
        },
        buy_threshold: read_f64(config, s, "buy_threshold", p.buy_threshold)?,
        sell_threshold: read_f64(config, s, "sell_threshold", p.sell_threshold)?,
    })
}

/// `tickers` (comma separated) wins over a single `ticker`.
fn tickers(config: &dyn ConfigPort, section: &str) -> Result<Vec<String>, MarketsenseError> {
    let mut list = config.get_list(section, "tickers");
    if list.is_empty() {
        list = config.get_list(section, "ticker");
    }
    if list.is_empty() {
        return Err(MarketsenseError::config_missing(section, "ticker"));
    }
    Ok(list)
}

fn date_range(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), MarketsenseError> {
    let start = parse_date(config, section, "start_date")?;
    let end = parse_date(config, section, "end_date")?;
    if let (Some(s), Some(e)) = (start, end) {
        if s >= e {
            return Err(MarketsenseError::config_invalid(
                section,
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok((start, end))
}

fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, MarketsenseError> {
    match non_empty(config.get_string(section, key)) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                MarketsenseError::config_invalid(
                    section,
                    key,
                    format!("invalid {} '{}', expected YYYY-MM-DD", key, s),
                )
            }),
    }
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, MarketsenseError> {
    match non_empty(config.get_string(section, key)) {
        None => Ok(default),
        Some(s) => s.parse::<f64>().map_err(|_| {
            MarketsenseError::config_invalid(section, key, format!("'{}' is not a number", s))
        }),
    }
}

fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, MarketsenseError> {
    match non_empty(config.get_string(section, key)) {
        None => Ok(default),
        Some(s) => s.parse::<usize>().map_err(|_| {
            MarketsenseError::config_invalid(
                section,
                key,
                format!("'{}' is not a non-negative integer", s),
            )
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
