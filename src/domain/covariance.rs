//! Covariance estimator.
//!
//! Aligns the universe on the dates every ticker trades, keeps the most recent
//! `lookback_days` of them, and estimates annualized mean log-returns and the
//! annualized sample covariance of log-returns.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::error::MarketsenseError;
use super::ohlcv::{log_returns, PriceSeries};

/// Minimum number of aligned return observations.
pub const MIN_OBSERVATIONS: usize = 2;

/// Relative tolerance for eigenvalues that are negative only by rounding.
const EIGEN_TOLERANCE: f64 = 1e-10;

/// Tickers considered for allocation, one price series each.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetUniverse {
    pub series: Vec<PriceSeries>,
}

impl AssetUniverse {
    pub fn new(series: Vec<PriceSeries>) -> Self {
        AssetUniverse { series }
    }

    pub fn tickers(&self) -> Vec<String> {
        self.series.iter().map(|s| s.ticker.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// μ and Σ over the same aligned window, indexed like `tickers`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnEstimates {
    pub tickers: Vec<String>,
    pub mean_returns: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub observations: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReturnEstimates {
    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn portfolio_return(&self, weights: &DVector<f64>) -> f64 {
        self.mean_returns.dot(weights)
    }

    pub fn portfolio_volatility(&self, weights: &DVector<f64>) -> f64 {
        let variance = weights.dot(&(&self.covariance * weights));
        variance.max(0.0).sqrt()
    }

    /// Per-asset volatility, sqrt of the covariance diagonal.
    pub fn asset_volatilities(&self) -> Vec<f64> {
        self.covariance
            .diagonal()
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect()
    }
}

pub fn estimate_returns(
    universe: &AssetUniverse,
    lookback_days: usize,
    trading_days_per_year: f64,
) -> Result<ReturnEstimates, MarketsenseError> {
    if universe.is_empty() {
        return Err(MarketsenseError::InsufficientHistory {
            ticker: "<empty universe>".to_string(),
            observations: 0,
            required: MIN_OBSERVATIONS,
        });
    }
    if lookback_days == 0 {
        return Err(MarketsenseError::config_invalid(
            "optimizer",
            "lookback_days",
            "must be greater than 0",
        ));
    }

    let mut seen = HashSet::new();
    for series in &universe.series {
        series.validate()?;
        if !seen.insert(series.ticker.as_str()) {
            return Err(MarketsenseError::DataSource {
                reason: format!("duplicate ticker {} in universe", series.ticker),
            });
        }
    }

    let dates = aligned_dates(universe, lookback_days);
    let observations = dates.len().saturating_sub(1);
    if observations < MIN_OBSERVATIONS {
        // name the shortest history, the likeliest culprit
        let shortest = universe
            .series
            .iter()
            .min_by_key(|s| s.len())
            .map(|s| s.ticker.clone())
            .unwrap_or_default();
        return Err(MarketsenseError::InsufficientHistory {
            ticker: shortest,
            observations,
            required: MIN_OBSERVATIONS,
        });
    }

    let n = universe.len();
    let mut returns = DMatrix::<f64>::zeros(observations, n);
    for (j, series) in universe.series.iter().enumerate() {
        let closes: Vec<f64> = series
            .bars
            .iter()
            .filter(|b| dates.binary_search(&b.date).is_ok())
            .map(|b| b.close)
            .collect();
        for (i, r) in log_returns(&closes).into_iter().enumerate() {
            returns[(i, j)] = r;
        }
    }

    let obs = observations as f64;
    let means = DVector::from_iterator(n, returns.column_iter().map(|c| c.sum() / obs));
    let mut centered = returns.clone();
    for (j, mut column) in centered.column_iter_mut().enumerate() {
        column.add_scalar_mut(-means[j]);
    }
    let sample_cov = (centered.transpose() * &centered) / (obs - 1.0);

    let covariance = regularize(sample_cov * trading_days_per_year)?;
    let mean_returns = means * trading_days_per_year;

    debug!(
        assets = n,
        observations,
        start = %dates[0],
        end = %dates[dates.len() - 1],
        "estimated return moments"
    );

    Ok(ReturnEstimates {
        tickers: universe.tickers(),
        mean_returns,
        covariance,
        observations,
        start_date: dates[0],
        end_date: dates[dates.len() - 1],
    })
}

/// Dates present in every series, most recent `lookback_days` of them, ascending.
fn aligned_dates(universe: &AssetUniverse, lookback_days: usize) -> Vec<NaiveDate> {
    let mut common: BTreeSet<NaiveDate> = match universe.series.first() {
        Some(first) => first.bars.iter().map(|b| b.date).collect(),
        None => return Vec::new(),
    };
    for series in &universe.series[1..] {
        let dates: BTreeSet<NaiveDate> = series.bars.iter().map(|b| b.date).collect();
        common = common.intersection(&dates).copied().collect();
    }
    let skip = common.len().saturating_sub(lookback_days);
    common.into_iter().skip(skip).collect()
}

/// Symmetrize and project rounding-level negative eigenvalues to zero.
/// Genuinely indefinite or non-finite input is rejected.
pub fn regularize(matrix: DMatrix<f64>) -> Result<DMatrix<f64>, MarketsenseError> {
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(MarketsenseError::NumericalInstability {
            reason: "covariance matrix has non-finite entries".to_string(),
        });
    }
    let symmetric = (&matrix + matrix.transpose()) * 0.5;
    let eigen = symmetric.clone().symmetric_eigen();

    let scale = eigen.eigenvalues.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let min = eigen.eigenvalues.min();
    if min < -EIGEN_TOLERANCE * scale {
        return Err(MarketsenseError::NumericalInstability {
            reason: format!(
                "covariance matrix is not positive semidefinite (eigenvalue {:.3e})",
                min
            ),
        });
    }
    if min >= 0.0 {
        return Ok(symmetric);
    }

    let clipped = eigen.eigenvalues.map(|v| v.max(0.0));
    let rebuilt = &eigen.eigenvectors
        * DMatrix::from_diagonal(&clipped)
        * eigen.eigenvectors.transpose();
    Ok((&rebuilt + rebuilt.transpose()) * 0.5)
}
