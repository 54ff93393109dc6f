//! CSV price file adapter.
//!
//! One file per ticker, `{TICKER}.csv`, with a `date,open,high,low,close,volume`
//! header. Dates are `YYYY-MM-DD`.

use crate::domain::error::MarketsenseError;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

impl PriceDataPort for CsvAdapter {
    fn fetch_series(
        &self,
        ticker: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, MarketsenseError> {
        let path = self.csv_path(ticker);
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| MarketsenseError::DataSource {
                reason: format!("failed to open {}: {}", path.display(), e),
            })?;

        let mut bars = Vec::new();
        for row in rdr.deserialize::<CsvRow>() {
            let row = row.map_err(|e| MarketsenseError::DataSource {
                reason: format!("{}: {}", path.display(), e),
            })?;
            if start.is_some_and(|s| row.date < s) || end.is_some_and(|e| row.date > e) {
                continue;
            }
            bars.push(PriceBar {
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        debug!(ticker, bars = bars.len(), path = %path.display(), "loaded price file");
        Ok(PriceSeries::new(ticker, bars))
    }

    fn list_tickers(&self) -> Result<Vec<String>, MarketsenseError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| MarketsenseError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    tickers.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("005930.csv"), csv_content).unwrap();
        fs::write(path.join("000660.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "not a price file").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_series_sorts_and_parses() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter.fetch_series("005930", None, None).unwrap();

        assert_eq!(series.ticker, "005930");
        assert_eq!(series.len(), 3);
        assert_eq!(series.bars[0].date, date(15));
        assert_eq!(series.bars[0].open, 100.0);
        assert_eq!(series.bars[0].high, 110.0);
        assert_eq!(series.bars[0].low, 90.0);
        assert_eq!(series.bars[0].close, 105.0);
        assert_eq!(series.bars[0].volume, 50000.0);
        assert!(series.validate().is_ok());
    }

    #[test]
    fn fetch_series_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter
            .fetch_series("005930", Some(date(16)), Some(date(16)))
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars[0].date, date(16));

        let tail = adapter.fetch_series("005930", Some(date(16)), None).unwrap();
        assert_eq!(tail.len(), 2);
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_series("XYZ", None, None);
        assert!(matches!(result, Err(MarketsenseError::DataSource { .. })));
    }

    #[test]
    fn malformed_row_is_data_source_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-15,1,2,0.5,abc,10\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_series("BAD", None, None);
        assert!(matches!(result, Err(MarketsenseError::DataSource { .. })));
    }

    #[test]
    fn header_only_file_is_empty_series() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.fetch_series("000660", None, None).unwrap().is_empty());
    }

    #[test]
    fn list_tickers_only_csv_files() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(adapter.list_tickers().unwrap(), vec!["000660", "005930"]);
    }
}
