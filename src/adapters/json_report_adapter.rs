//! JSON report adapter.
//!
//! Writes pretty-printed JSON to a file, or to stdout when no path is set.

use crate::domain::backtest::{BacktestResult, StrategyOutcome};
use crate::domain::error::MarketsenseError;
use crate::domain::strategy::StrategyConfig;
use crate::ports::report_port::{BacktestReport, OptimizationReport, ReportPort};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// One row of a strategy comparison: the result, or why the run failed.
#[derive(Debug, Serialize)]
struct ComparisonEntry<'a> {
    strategy: &'a StrategyConfig,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a BacktestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub struct JsonReportAdapter {
    output: Option<PathBuf>,
}

impl JsonReportAdapter {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }

    pub fn stdout() -> Self {
        Self { output: None }
    }

    fn emit<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), MarketsenseError> {
        match &self.output {
            Some(path) => {
                let mut writer = BufWriter::new(File::create(path)?);
                serde_json::to_writer_pretty(&mut writer, value)?;
                writeln!(writer)?;
                writer.flush()?;
                info!(path = %path.display(), "report written");
            }
            None => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                serde_json::to_writer_pretty(&mut lock, value)?;
                writeln!(lock)?;
            }
        }
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_backtests(&self, reports: &[BacktestReport<'_>]) -> Result<(), MarketsenseError> {
        match reports {
            [single] => self.emit(single),
            many => self.emit(many),
        }
    }

    fn write_comparison(&self, outcomes: &[StrategyOutcome]) -> Result<(), MarketsenseError> {
        let entries: Vec<ComparisonEntry<'_>> = outcomes
            .iter()
            .map(|o| ComparisonEntry {
                strategy: &o.strategy,
                label: o.strategy.to_string(),
                result: o.result.as_ref().ok(),
                error: o.result.as_ref().err().map(|e| e.to_string()),
            })
            .collect();
        self.emit(&entries)
    }

    fn write_optimization(&self, report: &OptimizationReport<'_>) -> Result<(), MarketsenseError> {
        self.emit(report)
    }
}
