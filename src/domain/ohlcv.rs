//! Daily OHLCV bars and per-ticker price series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::MarketsenseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ordered daily bars for one ticker. Owned by the caller; the core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Check that every close is positive and finite and dates strictly increase.
    pub fn validate(&self) -> Result<(), MarketsenseError> {
        let mut prev: Option<NaiveDate> = None;
        for bar in &self.bars {
            if !(bar.close.is_finite() && bar.close > 0.0) {
                return Err(MarketsenseError::InvalidPrice {
                    ticker: self.ticker.clone(),
                    date: bar.date,
                    reason: format!("non-positive close {}", bar.close),
                });
            }
            if let Some(p) = prev {
                if bar.date <= p {
                    return Err(MarketsenseError::InvalidPrice {
                        ticker: self.ticker.clone(),
                        date: bar.date,
                        reason: format!("date not after previous bar {}", p),
                    });
                }
            }
            prev = Some(bar.date);
        }
        Ok(())
    }

    /// Bars with date in `[start, end]`, inclusive.
    pub fn slice_dates(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        PriceSeries {
            ticker: self.ticker.clone(),
            bars: self
                .bars
                .iter()
                .filter(|b| b.date >= start && b.date <= end)
                .cloned()
                .collect(),
        }
    }
}

/// Natural-log returns of consecutive values: ln(v[i] / v[i-1]).
pub fn log_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn validate_accepts_clean_series() {
        let series = PriceSeries::new("005930", vec![bar(1, 10.0), bar(2, 11.0), bar(3, 12.0)]);
        assert!(series.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_close() {
        let series = PriceSeries::new("005930", vec![bar(1, 10.0), bar(2, 0.0)]);
        match series.validate() {
            Err(MarketsenseError::InvalidPrice { ticker, date, .. }) => {
                assert_eq!(ticker, "005930");
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
            }
            other => panic!("expected InvalidPrice, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_negative_and_nan_close() {
        let neg = PriceSeries::new("A", vec![bar(1, -1.0)]);
        assert!(matches!(neg.validate(), Err(MarketsenseError::InvalidPrice { .. })));
        let nan = PriceSeries::new("A", vec![bar(1, f64::NAN)]);
        assert!(matches!(nan.validate(), Err(MarketsenseError::InvalidPrice { .. })));
    }

    #[test]
    fn validate_rejects_duplicate_or_backward_dates() {
        let dup = PriceSeries::new("A", vec![bar(2, 10.0), bar(2, 11.0)]);
        assert!(matches!(dup.validate(), Err(MarketsenseError::InvalidPrice { .. })));
        let back = PriceSeries::new("A", vec![bar(3, 10.0), bar(2, 11.0)]);
        assert!(matches!(back.validate(), Err(MarketsenseError::InvalidPrice { .. })));
    }

    #[test]
    fn slice_dates_is_inclusive() {
        let series = PriceSeries::new("A", (1..=5).map(|d| bar(d, d as f64)).collect());
        let sliced = series.slice_dates(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        );
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.closes(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn log_returns_of_doubling() {
        let r = log_returns(&[1.0, 2.0, 4.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 2f64.ln()).abs() < 1e-12);
        assert!((r[1] - 2f64.ln()).abs() < 1e-12);
    }
}
