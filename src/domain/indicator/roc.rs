//! ROC (Rate of Change) as a fractional trailing return.
//!
//! ROC(n)[i] = C[i] / C[i-n] - 1
//! Warmup: first n bars invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_roc(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for i in 0..bars.len() {
        let valid = period > 0 && i >= period && bars[i - period].close != 0.0;
        let value = if valid {
            bars[i].close / bars[i - period].close - 1.0
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: bars[i].date,
            valid,
            value: IndicatorValue::Simple(value),
        });
    }

    IndicatorSeries { values }
}
