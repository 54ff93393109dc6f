//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for marketsense.
#[derive(Debug, thiserror::Error)]
pub enum MarketsenseError {
    #[error("insufficient data for {ticker}: have {bars} bars, strategy {strategy} needs {minimum}")]
    InsufficientData {
        ticker: String,
        strategy: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid price data for {ticker} on {date}: {reason}")]
    InvalidPrice {
        ticker: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("insufficient history for {ticker}: {observations} overlapping observations, need {required}")]
    InsufficientHistory {
        ticker: String,
        observations: usize,
        required: usize,
    },

    #[error("infeasible weight constraints: {reason}")]
    InfeasibleConstraints { reason: String },

    #[error("numerical instability: {reason}")]
    NumericalInstability { reason: String },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MarketsenseError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MarketsenseError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config_missing(section: &str, key: &str) -> Self {
        MarketsenseError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&MarketsenseError> for std::process::ExitCode {
    fn from(err: &MarketsenseError) -> Self {
        let code: u8 = match err {
            MarketsenseError::Io(_) | MarketsenseError::Serialization(_) => 1,
            MarketsenseError::ConfigParse { .. }
            | MarketsenseError::ConfigMissing { .. }
            | MarketsenseError::ConfigInvalid { .. }
            | MarketsenseError::UnknownStrategy { .. } => 2,
            MarketsenseError::DataSource { .. } | MarketsenseError::InvalidPrice { .. } => 3,
            MarketsenseError::InsufficientData { .. } => 4,
            MarketsenseError::InsufficientHistory { .. }
            | MarketsenseError::InfeasibleConstraints { .. }
            | MarketsenseError::NumericalInstability { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
