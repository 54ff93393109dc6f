//! Strategy library.
//!
//! Strategies form a closed set of tagged variants. Each variant is a pure
//! function of a `PriceSeries` and its own parameters that emits exactly one
//! `Signal` per bar; the simulator only ever sees the signal sequence.

mod bollinger;
mod buy_and_hold;
mod composite;
mod macd;
mod momentum;
mod rsi;
mod sma_crossover;

pub use composite::{CompositeParams, CompositeWeights};

use crate::domain::error::MarketsenseError;
use crate::domain::indicator::macd::{macd_warmup, DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::{Action, Signal};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const STRATEGY_NAMES: [&str; 7] = [
    "buy_and_hold",
    "sma_crossover",
    "rsi",
    "macd",
    "bollinger_bands",
    "momentum",
    "composite_score",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum StrategyConfig {
    BuyAndHold,
    SmaCrossover {
        short: usize,
        long: usize,
    },
    Rsi {
        period: usize,
        oversold: f64,
        overbought: f64,
    },
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    BollingerBands {
        window: usize,
        num_std: f64,
    },
    Momentum {
        window: usize,
    },
    CompositeScore(CompositeParams),
}

impl StrategyConfig {
    /// The variant registered under `name` with its conventional parameters.
    pub fn with_defaults(name: &str) -> Result<Self, MarketsenseError> {
        let strategy = match name.trim().to_ascii_lowercase().as_str() {
            "buy_and_hold" => StrategyConfig::BuyAndHold,
            "sma_crossover" => StrategyConfig::SmaCrossover {
                short: 20,
                long: 50,
            },
            "rsi" => StrategyConfig::Rsi {
                period: 14,
                oversold: 30.0,
                overbought: 70.0,
            },
            "macd" => StrategyConfig::Macd {
                fast: DEFAULT_FAST,
                slow: DEFAULT_SLOW,
                signal: DEFAULT_SIGNAL,
            },
            "bollinger_bands" => StrategyConfig::BollingerBands {
                window: 20,
                num_std: 2.0,
            },
            "momentum" => StrategyConfig::Momentum { window: 20 },
            "composite_score" => StrategyConfig::CompositeScore(CompositeParams::default()),
            _ => {
                return Err(MarketsenseError::UnknownStrategy {
                    name: name.to_string(),
                })
            }
        };
        Ok(strategy)
    }

    /// Registry key, matching the serde tag.
    pub fn key(&self) -> &'static str {
        match self {
            StrategyConfig::BuyAndHold => "buy_and_hold",
            StrategyConfig::SmaCrossover { .. } => "sma_crossover",
            StrategyConfig::Rsi { .. } => "rsi",
            StrategyConfig::Macd { .. } => "macd",
            StrategyConfig::BollingerBands { .. } => "bollinger_bands",
            StrategyConfig::Momentum { .. } => "momentum",
            StrategyConfig::CompositeScore(_) => "composite_score",
        }
    }

    /// Bars required before the strategy can first emit a non-HOLD signal.
    /// Crossing rules need the indicator defined on the prior bar too.
    pub fn min_lookback(&self) -> usize {
        match self {
            StrategyConfig::BuyAndHold => 1,
            StrategyConfig::SmaCrossover { short, long } => (*short).max(*long) + 1,
            StrategyConfig::Rsi { period, .. } => period + 1,
            StrategyConfig::Macd { fast, slow, signal } => macd_warmup(*fast, *slow, *signal) + 1,
            StrategyConfig::BollingerBands { window, .. } => window + 1,
            StrategyConfig::Momentum { window } => window + 1,
            StrategyConfig::CompositeScore(params) => params.min_lookback(),
        }
    }

    pub fn validate(&self) -> Result<(), MarketsenseError> {
        match self {
            StrategyConfig::BuyAndHold => Ok(()),
            StrategyConfig::SmaCrossover { short, long } => {
                require_positive("short", *short)?;
                require_positive("long", *long)?;
                if short >= long {
                    return Err(MarketsenseError::config_invalid(
                        "strategy",
                        "short",
                        format!("short window {} must be less than long window {}", short, long),
                    ));
                }
                Ok(())
            }
            StrategyConfig::Rsi {
                period,
                oversold,
                overbought,
            } => {
                require_positive("period", *period)?;
                validate_rsi_levels(*oversold, *overbought)
            }
            StrategyConfig::Macd { fast, slow, signal } => {
                require_positive("fast", *fast)?;
                require_positive("slow", *slow)?;
                require_positive("signal", *signal)?;
                if fast >= slow {
                    return Err(MarketsenseError::config_invalid(
                        "strategy",
                        "fast",
                        format!("fast period {} must be less than slow period {}", fast, slow),
                    ));
                }
                Ok(())
            }
            StrategyConfig::BollingerBands { window, num_std } => {
                require_positive("window", *window)?;
                if !num_std.is_finite() || *num_std <= 0.0 {
                    return Err(MarketsenseError::config_invalid(
                        "strategy",
                        "num_std",
                        format!("must be a positive number, got {}", num_std),
                    ));
                }
                Ok(())
            }
            StrategyConfig::Momentum { window } => require_positive("window", *window),
            StrategyConfig::CompositeScore(params) => params.validate(),
        }
    }

    /// One signal per bar of `series`, HOLD wherever the rule does not fire.
    pub fn generate(&self, series: &PriceSeries) -> Result<Vec<Signal>, MarketsenseError> {
        self.validate()?;
        let bars = &series.bars;
        let signals = match self {
            StrategyConfig::BuyAndHold => buy_and_hold::generate(bars),
            StrategyConfig::SmaCrossover { short, long } => {
                sma_crossover::generate(bars, *short, *long)
            }
            StrategyConfig::Rsi {
                period,
                oversold,
                overbought,
            } => rsi::generate(bars, *period, *oversold, *overbought),
            StrategyConfig::Macd { fast, slow, signal } => {
                macd::generate(bars, *fast, *slow, *signal)
            }
            StrategyConfig::BollingerBands { window, num_std } => {
                bollinger::generate(bars, *window, *num_std)
            }
            StrategyConfig::Momentum { window } => momentum::generate(bars, *window),
            StrategyConfig::CompositeScore(params) => composite::generate(bars, params),
        };
        debug_assert_eq!(signals.len(), bars.len());
        Ok(signals)
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyConfig::BuyAndHold => write!(f, "BuyAndHold"),
            StrategyConfig::SmaCrossover { short, long } => {
                write!(f, "SMACrossover({},{})", short, long)
            }
            StrategyConfig::Rsi {
                period,
                oversold,
                overbought,
            } => write!(f, "RSI({},{},{})", period, oversold, overbought),
            StrategyConfig::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            StrategyConfig::BollingerBands { window, num_std } => {
                write!(f, "BollingerBands({},{})", window, num_std)
            }
            StrategyConfig::Momentum { window } => write!(f, "Momentum({})", window),
            StrategyConfig::CompositeScore(params) => write!(
                f,
                "CompositeScore({},{})",
                params.buy_threshold, params.sell_threshold
            ),
        }
    }
}

fn require_positive(key: &str, value: usize) -> Result<(), MarketsenseError> {
    if value == 0 {
        return Err(MarketsenseError::config_invalid("strategy", key, "must be greater than 0"));
    }
    Ok(())
}

pub(crate) fn validate_rsi_levels(oversold: f64, overbought: f64) -> Result<(), MarketsenseError> {
    let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
    if !in_range(oversold) || !in_range(overbought) || oversold >= overbought {
        return Err(MarketsenseError::config_invalid(
            "strategy",
            "oversold",
            format!(
                "need 0 <= oversold < overbought <= 100, got {} / {}",
                oversold, overbought
            ),
        ));
    }
    Ok(())
}

/// Crossover of `fast` over `slow` between the prior bar and this one.
///
/// BUY when fast was at or below slow and is now above, SELL on the mirror
/// move, HOLD otherwise or when either bar is undefined.
pub(crate) fn cross_action(prev: Option<(f64, f64)>, now: Option<(f64, f64)>) -> Action {
    match (prev, now) {
        (Some((pf, ps)), Some((f, s))) if pf <= ps && f > s => Action::Buy,
        (Some((pf, ps)), Some((f, s))) if pf >= ps && f < s => Action::Sell,
        _ => Action::Hold,
    }
}

#[cfg(test)]
pub(crate) fn series_from_closes(closes: &[f64]) -> PriceSeries {
    PriceSeries::new("TEST", crate::domain::indicator::bars_from_closes(closes))
}
