//! Price data access port trait.

use crate::domain::error::MarketsenseError;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

/// Supplies clean, date-ordered daily series. Gap filling is the provider's job.
pub trait PriceDataPort {
    /// Bars for `ticker` with `start <= date <= end`; open ends are unbounded.
    fn fetch_series(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, MarketsenseError>;

    fn list_tickers(&self) -> Result<Vec<String>, MarketsenseError>;
}
