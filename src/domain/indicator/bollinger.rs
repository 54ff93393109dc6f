//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_bollinger(bars: &[PriceBar], period: usize, mult: f64) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let warmup = period.saturating_sub(1);

    for i in 0..bars.len() {
        let date = bars[i].date;
        let valid = period > 0 && i >= warmup;

        let (upper, middle, lower) = if valid {
            let window = &bars[i + 1 - period..=i];

            let middle_val: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
            let variance: f64 = window
                .iter()
                .map(|b| {
                    let diff = b.close - middle_val;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;

            let stddev = variance.sqrt();
            (middle_val + mult * stddev, middle_val, middle_val - mult * stddev)
        } else {
            (0.0, 0.0, 0.0)
        };

        values.push(IndicatorPoint {
            date,
            valid,
            value: IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
        });
    }

    IndicatorSeries { values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::bars_from_closes;

    #[test]
    fn bollinger_warmup() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let series = calculate_bollinger(&bars, 3, 2.0);
        assert!(series.bollinger_at(1).is_none());
        assert!(series.bollinger_at(2).is_some());
    }

    #[test]
    fn bollinger_constant_prices_collapse_bands() {
        let bars = bars_from_closes(&[50.0; 5]);
        let series = calculate_bollinger(&bars, 3, 2.0);
        let (upper, middle, lower) = series.bollinger_at(4).unwrap();
        assert!((upper - 50.0).abs() < 1e-12);
        assert!((middle - 50.0).abs() < 1e-12);
        assert!((lower - 50.0).abs() < 1e-12);
    }

    #[test]
    fn bollinger_known_values() {
        // window [2, 4, 6]: mean 4, population variance 8/3
        let bars = bars_from_closes(&[2.0, 4.0, 6.0]);
        let series = calculate_bollinger(&bars, 3, 2.0);
        let (upper, middle, lower) = series.bollinger_at(2).unwrap();
        let sd = (8.0f64 / 3.0).sqrt();
        assert!((middle - 4.0).abs() < 1e-12);
        assert!((upper - (4.0 + 2.0 * sd)).abs() < 1e-12);
        assert!((lower - (4.0 - 2.0 * sd)).abs() < 1e-12);
    }

    #[test]
    fn bollinger_wider_multiplier_widens_bands() {
        let bars = bars_from_closes(&[2.0, 4.0, 6.0]);
        let narrow = calculate_bollinger(&bars, 3, 1.0).bollinger_at(2).unwrap();
        let wide = calculate_bollinger(&bars, 3, 2.5).bollinger_at(2).unwrap();
        assert!((wide.0 - wide.2) > (narrow.0 - narrow.2));
        assert!((wide.1 - narrow.1).abs() < 1e-12);
    }

    #[test]
    fn bollinger_zero_period_never_valid() {
        let series = calculate_bollinger(&bars_from_closes(&[1.0, 2.0]), 0, 2.0);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
