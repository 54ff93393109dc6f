//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_sma(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let raw = sma_of(&closes, period);

    let values = bars
        .iter()
        .zip(raw)
        .map(|(bar, v)| IndicatorPoint {
            date: bar.date,
            valid: v.is_some(),
            value: IndicatorValue::Simple(v.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries { values }
}

/// Rolling mean over an arbitrary slice (closes, volumes, ...).
pub fn sma_of(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::bars_from_closes;

    #[test]
    fn sma_warmup_and_values() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let series = calculate_sma(&bars, 3);

        assert_eq!(series.values.len(), 5);
        assert_eq!(series.simple_at(0), None);
        assert_eq!(series.simple_at(1), None);
        assert!((series.simple_at(2).unwrap() - 2.0).abs() < 1e-12);
        assert!((series.simple_at(3).unwrap() - 3.0).abs() < 1e-12);
        assert!((series.simple_at(4).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn sma_period_one_is_identity() {
        let raw = sma_of(&[3.0, 7.0], 1);
        assert_eq!(raw, vec![Some(3.0), Some(7.0)]);
    }

    #[test]
    fn sma_zero_period_all_invalid() {
        let bars = bars_from_closes(&[1.0, 2.0]);
        let series = calculate_sma(&bars, 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn sma_period_longer_than_series() {
        let raw = sma_of(&[1.0, 2.0], 5);
        assert_eq!(raw, vec![None, None]);
    }
}
