#![allow(dead_code)]

use chrono::NaiveDate;
use marketsense::domain::backtest::BacktestConfig;
use marketsense::domain::error::MarketsenseError;
pub use marketsense::domain::ohlcv::{PriceBar, PriceSeries};
use marketsense::ports::data_port::PriceDataPort;
use std::collections::HashMap;

pub struct MockPriceData {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockPriceData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.data.insert(series.ticker.clone(), series);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceData {
    fn fetch_series(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, MarketsenseError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(MarketsenseError::DataSource {
                reason: reason.clone(),
            });
        }
        let series = self
            .data
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| PriceSeries::new(ticker, vec![]));
        Ok(series.slice_dates(
            start.unwrap_or(NaiveDate::MIN),
            end.unwrap_or(NaiveDate::MAX),
        ))
    }

    fn list_tickers(&self) -> Result<Vec<String>, MarketsenseError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        date,
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1_000_000.0,
    }
}

/// One bar per calendar day from 2024-01-01.
pub fn series_from_closes(ticker: &str, closes: &[f64]) -> PriceSeries {
    let start = date(2024, 1, 1);
    PriceSeries::new(
        ticker,
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| make_bar(start + chrono::Duration::days(i as i64), c))
            .collect(),
    )
}

/// Deterministic oscillating path with drift; distinct `phase` values give
/// imperfectly correlated assets.
pub fn wave_series(ticker: &str, count: usize, drift: f64, amplitude: f64, phase: f64) -> PriceSeries {
    let mut price = 100.0;
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            let r = drift
                + amplitude * (t * 0.7 + phase).sin()
                + 0.5 * amplitude * (t * 0.23 + 2.0 * phase).cos();
            price *= r.exp();
            price
        })
        .collect();
    series_from_closes(ticker, &closes)
}

pub fn frictionless_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: 10_000_000.0,
        transaction_cost_rate: 0.0,
        slippage_rate: 0.0,
        risk_free_rate: 0.035,
        trading_days_per_year: 252.0,
    }
}
