//! Composite score ("AI signal").
//!
//! Each sub-indicator maps the bar to a score in [-1, 1] using a fixed ladder:
//!
//! - trend: close vs SMA(short) vs SMA(long)
//! - rsi: oversold / overbought bands with a half-strength zone 10 points inside
//! - macd: line vs signal, strengthened when the line agrees in sign
//! - bollinger: close vs lower / middle / upper band
//! - volume: a volume surge signed by the day's price direction
//!
//! The weighted sum is normalized by the weights of the sub-indicators that
//! are defined on the bar and clamped to [-1, 1].

use crate::domain::error::MarketsenseError;
use crate::domain::indicator::macd::{macd_warmup, DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator::{calculate_bollinger, calculate_macd, calculate_rsi, calculate_sma, sma_of};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{Action, Signal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub trend: f64,
    pub rsi: f64,
    pub macd: f64,
    pub bollinger: f64,
    pub volume: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        CompositeWeights {
            trend: 0.3,
            rsi: 0.25,
            macd: 0.25,
            bollinger: 0.2,
            volume: 0.0,
        }
    }
}

impl CompositeWeights {
    fn as_array(&self) -> [(&'static str, f64); 5] {
        [
            ("weight_trend", self.trend),
            ("weight_rsi", self.rsi),
            ("weight_macd", self.macd),
            ("weight_bollinger", self.bollinger),
            ("weight_volume", self.volume),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_window: usize,
    pub bb_num_std: f64,
    pub volume_window: usize,
    pub volume_surge: f64,
    pub weights: CompositeWeights,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

impl Default for CompositeParams {
    fn default() -> Self {
        CompositeParams {
            sma_short: 20,
            sma_long: 50,
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            macd_fast: DEFAULT_FAST,
            macd_slow: DEFAULT_SLOW,
            macd_signal: DEFAULT_SIGNAL,
            bb_window: 20,
            bb_num_std: 2.0,
            volume_window: 20,
            volume_surge: 1.5,
            weights: CompositeWeights::default(),
            buy_threshold: 0.4,
            sell_threshold: -0.4,
        }
    }
}

impl CompositeParams {
    /// Longest warmup among the sub-indicators that carry weight.
    pub fn min_lookback(&self) -> usize {
        let w = &self.weights;
        [
            (w.trend, self.sma_short.max(self.sma_long)),
            (w.rsi, self.rsi_period + 1),
            (
                w.macd,
                macd_warmup(self.macd_fast, self.macd_slow, self.macd_signal) + 1,
            ),
            (w.bollinger, self.bb_window),
            (w.volume, self.volume_window.max(2)),
        ]
        .iter()
        .filter(|(weight, _)| *weight > 0.0)
        .map(|(_, bars)| *bars)
        .max()
        .unwrap_or(1)
    }

    pub fn validate(&self) -> Result<(), MarketsenseError> {
        for (key, value) in [
            ("sma_short", self.sma_short),
            ("sma_long", self.sma_long),
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("bb_window", self.bb_window),
            ("volume_window", self.volume_window),
        ] {
            if value == 0 {
                return Err(MarketsenseError::config_invalid(
                    "strategy",
                    key,
                    "must be greater than 0",
                ));
            }
        }
        if self.sma_short >= self.sma_long {
            return Err(MarketsenseError::config_invalid(
                "strategy",
                "sma_short",
                "must be less than sma_long",
            ));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(MarketsenseError::config_invalid(
                "strategy",
                "macd_fast",
                "must be less than macd_slow",
            ));
        }
        super::validate_rsi_levels(self.rsi_oversold, self.rsi_overbought)?;
        if !self.bb_num_std.is_finite() || self.bb_num_std <= 0.0 {
            return Err(MarketsenseError::config_invalid(
                "strategy",
                "bb_num_std",
                "must be a positive number",
            ));
        }
        if !self.volume_surge.is_finite() || self.volume_surge <= 0.0 {
            return Err(MarketsenseError::config_invalid(
                "strategy",
                "volume_surge",
                "must be a positive number",
            ));
        }

        let weights = self.weights.as_array();
        for (key, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(MarketsenseError::config_invalid(
                    "strategy",
                    key,
                    format!("weight must be finite and non-negative, got {}", weight),
                ));
            }
        }
        if weights.iter().all(|(_, w)| *w == 0.0) {
            return Err(MarketsenseError::config_invalid(
                "strategy",
                "weight_trend",
                "at least one sub-indicator weight must be positive",
            ));
        }

        let in_unit = |v: f64| v.is_finite() && (-1.0..=1.0).contains(&v);
        if !in_unit(self.buy_threshold)
            || !in_unit(self.sell_threshold)
            || self.sell_threshold >= self.buy_threshold
        {
            return Err(MarketsenseError::config_invalid(
                "strategy",
                "buy_threshold",
                format!(
                    "need -1 <= sell_threshold < buy_threshold <= 1, got {} / {}",
                    self.sell_threshold, self.buy_threshold
                ),
            ));
        }
        Ok(())
    }
}

pub(super) fn generate(bars: &[PriceBar], params: &CompositeParams) -> Vec<Signal> {
    let scores = composite_scores(bars, params);

    bars.iter()
        .zip(scores)
        .map(|(bar, score)| {
            let action = match score {
                Some(s) if s > params.buy_threshold => Action::Buy,
                Some(s) if s < params.sell_threshold => Action::Sell,
                _ => Action::Hold,
            };
            Signal::new(bar.date, action)
        })
        .collect()
}

/// Normalized score per bar, `None` where no weighted sub-indicator is defined.
pub(crate) fn composite_scores(bars: &[PriceBar], params: &CompositeParams) -> Vec<Option<f64>> {
    let sma_short = calculate_sma(bars, params.sma_short);
    let sma_long = calculate_sma(bars, params.sma_long);
    let rsi = calculate_rsi(bars, params.rsi_period);
    let macd = calculate_macd(bars, params.macd_fast, params.macd_slow, params.macd_signal);
    let bands = calculate_bollinger(bars, params.bb_window, params.bb_num_std);
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let avg_volume = sma_of(&volumes, params.volume_window);
    let w = &params.weights;

    (0..bars.len())
        .map(|i| {
            let close = bars[i].close;
            let terms = [
                (
                    w.trend,
                    sma_short
                        .simple_at(i)
                        .zip(sma_long.simple_at(i))
                        .map(|(s, l)| trend_score(close, s, l)),
                ),
                (
                    w.rsi,
                    rsi.simple_at(i)
                        .map(|r| rsi_score(r, params.rsi_oversold, params.rsi_overbought)),
                ),
                (w.macd, macd.macd_at(i).map(|(line, sig)| macd_score(line, sig))),
                (
                    w.bollinger,
                    bands
                        .bollinger_at(i)
                        .map(|(u, m, l)| bollinger_score(close, u, m, l)),
                ),
                (
                    w.volume,
                    match (i.checked_sub(1), avg_volume[i]) {
                        (Some(prev), Some(avg)) => Some(volume_score(
                            bars[i].volume,
                            avg,
                            params.volume_surge,
                            close - bars[prev].close,
                        )),
                        _ => None,
                    },
                ),
            ];

            let mut score = 0.0;
            let mut weight_sum = 0.0;
            for (weight, value) in terms {
                if let Some(v) = value {
                    if weight > 0.0 {
                        score += weight * v;
                        weight_sum += weight;
                    }
                }
            }
            (weight_sum > 0.0).then(|| (score / weight_sum).clamp(-1.0, 1.0))
        })
        .collect()
}

fn trend_score(close: f64, short: f64, long: f64) -> f64 {
    if close > short && short > long {
        1.0
    } else if close > short {
        0.5
    } else if close < short && short < long {
        -1.0
    } else if close < short {
        -0.5
    } else {
        0.0
    }
}

fn rsi_score(rsi: f64, oversold: f64, overbought: f64) -> f64 {
    if rsi < oversold {
        1.0
    } else if rsi < oversold + 10.0 {
        0.5
    } else if rsi > overbought {
        -1.0
    } else if rsi > overbought - 10.0 {
        -0.5
    } else {
        0.0
    }
}

fn macd_score(line: f64, signal: f64) -> f64 {
    if line > signal && line > 0.0 {
        1.0
    } else if line > signal {
        0.5
    } else if line < signal && line < 0.0 {
        -1.0
    } else if line < signal {
        -0.5
    } else {
        0.0
    }
}

fn bollinger_score(close: f64, upper: f64, middle: f64, lower: f64) -> f64 {
    if close < lower {
        1.0
    } else if close < middle {
        0.3
    } else if close > upper {
        -1.0
    } else if close > middle {
        -0.3
    } else {
        0.0
    }
}

fn volume_score(volume: f64, average: f64, surge: f64, price_change: f64) -> f64 {
    if average > 0.0 && volume > average * surge {
        if price_change > 0.0 {
            1.0
        } else if price_change < 0.0 {
            -1.0
        } else {
            0.0
        }
    } else {
        0.0
    }
}
