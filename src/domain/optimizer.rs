//! Mean-variance portfolio optimizer.
//!
//! MinVariance solves the box-constrained QP directly. MaxSharpe scans evenly
//! spaced target returns across the achievable range, solves the minimum
//! variance portfolio at each, and keeps the candidate with the best Sharpe
//! ratio. The global minimum-variance portfolio is always a candidate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::backtest::{DEFAULT_RISK_FREE_RATE, TRADING_DAYS_PER_YEAR};
use super::covariance::{estimate_returns, AssetUniverse, ReturnEstimates};
use super::error::MarketsenseError;
use super::metrics::sharpe_ratio;
use super::qp::MinVarianceProblem;

pub const DEFAULT_SHARPE_SCAN_POINTS: usize = 50;
pub const DEFAULT_LOOKBACK_DAYS: usize = 252;

/// Targets closer together than this collapse to a single point.
pub(crate) const FLAT_RETURN_RANGE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MaxSharpe,
    MinVariance,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::MaxSharpe => write!(f, "max_sharpe"),
            Objective::MinVariance => write!(f, "min_variance"),
        }
    }
}

impl FromStr for Objective {
    type Err = MarketsenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "max_sharpe" | "sharpe" => Ok(Objective::MaxSharpe),
            "min_variance" | "min_var" => Ok(Objective::MinVariance),
            other => Err(MarketsenseError::config_invalid(
                "optimizer",
                "objective",
                format!("unknown objective '{}', expected max_sharpe or min_variance", other),
            )),
        }
    }
}

/// Per-ticker weight limits applied uniformly across the universe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        WeightBounds {
            min_weight: 0.0,
            max_weight: 1.0,
        }
    }
}

impl WeightBounds {
    /// Fail unless some weight vector over `assets` tickers sums to 1 within bounds.
    pub fn check_feasible(&self, assets: usize) -> Result<(), MarketsenseError> {
        let infeasible = |reason: String| -> Result<(), MarketsenseError> {
            Err(MarketsenseError::InfeasibleConstraints { reason })
        };
        if !self.min_weight.is_finite() || !self.max_weight.is_finite() {
            return infeasible("weight bounds must be finite".to_string());
        }
        if self.min_weight > self.max_weight {
            return infeasible(format!(
                "min_weight {} exceeds max_weight {}",
                self.min_weight, self.max_weight
            ));
        }
        if assets == 0 {
            return infeasible("no assets to allocate".to_string());
        }
        let n = assets as f64;
        if n * self.min_weight > 1.0 + 1e-12 {
            return infeasible(format!(
                "{} x min_weight {} = {} exceeds 1",
                assets,
                self.min_weight,
                n * self.min_weight
            ));
        }
        if n * self.max_weight < 1.0 - 1e-12 {
            return infeasible(format!(
                "{} x max_weight {} = {} is below 1",
                assets,
                self.max_weight,
                n * self.max_weight
            ));
        }
        Ok(())
    }

    pub fn contains(&self, weight: f64, tolerance: f64) -> bool {
        weight >= self.min_weight - tolerance && weight <= self.max_weight + tolerance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub risk_free_rate: f64,
    pub trading_days_per_year: f64,
    pub sharpe_scan_points: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
            sharpe_scan_points: DEFAULT_SHARPE_SCAN_POINTS,
        }
    }
}

/// Ticker → weight. Only universe tickers appear; weights sum to 1.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioWeights(BTreeMap<String, f64>);

impl PortfolioWeights {
    pub fn from_vector(tickers: &[String], weights: &DVector<f64>) -> Self {
        PortfolioWeights(
            tickers
                .iter()
                .cloned()
                .zip(weights.iter().copied())
                .collect(),
        )
    }

    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.0.get(ticker).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub weights: PortfolioWeights,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub objective: Objective,
}

/// Estimate μ and Σ for `universe` over `lookback_days`, then optimize.
pub fn optimize_portfolio(
    universe: &AssetUniverse,
    objective: Objective,
    bounds: &WeightBounds,
    lookback_days: usize,
    config: &OptimizerConfig,
) -> Result<OptimizationResult, MarketsenseError> {
    bounds.check_feasible(universe.len())?;
    let estimates = estimate_returns(universe, lookback_days, config.trading_days_per_year)?;
    optimize(&estimates, objective, bounds, config)
}

pub fn optimize(
    estimates: &ReturnEstimates,
    objective: Objective,
    bounds: &WeightBounds,
    config: &OptimizerConfig,
) -> Result<OptimizationResult, MarketsenseError> {
    bounds.check_feasible(estimates.len())?;

    let gmv = min_variance_weights(estimates, bounds, None)?;
    let weights = match objective {
        Objective::MinVariance => gmv,
        Objective::MaxSharpe => max_sharpe_weights(estimates, bounds, config, gmv)?,
    };

    let result = assemble(estimates, &weights, objective, config.risk_free_rate);
    info!(
        objective = %objective,
        assets = estimates.len(),
        expected_return = result.expected_return,
        volatility = result.volatility,
        sharpe = result.sharpe_ratio,
        "optimization complete"
    );
    Ok(result)
}

pub(crate) fn min_variance_weights(
    estimates: &ReturnEstimates,
    bounds: &WeightBounds,
    target: Option<f64>,
) -> Result<DVector<f64>, MarketsenseError> {
    MinVarianceProblem {
        covariance: &estimates.covariance,
        min_weight: bounds.min_weight,
        max_weight: bounds.max_weight,
        return_target: target.map(|t| (&estimates.mean_returns, t)),
    }
    .solve()
}

fn max_sharpe_weights(
    estimates: &ReturnEstimates,
    bounds: &WeightBounds,
    config: &OptimizerConfig,
    gmv: DVector<f64>,
) -> Result<DVector<f64>, MarketsenseError> {
    let rf = config.risk_free_rate;
    let score = |w: &DVector<f64>| {
        sharpe_ratio(
            estimates.portfolio_return(w),
            estimates.portfolio_volatility(w),
            rf,
        )
    };

    let mut best_score = score(&gmv);
    let mut best = gmv;

    let (low, high) = achievable_return_range(&estimates.mean_returns, bounds);
    if high - low < FLAT_RETURN_RANGE {
        return Ok(best);
    }

    for target in linspace(low, high, config.sharpe_scan_points) {
        match min_variance_weights(estimates, bounds, Some(target)) {
            Ok(w) => {
                let s = score(&w);
                if s > best_score {
                    best_score = s;
                    best = w;
                }
            }
            Err(e) => debug!(target, error = %e, "skipping sharpe scan point"),
        }
    }
    Ok(best)
}

fn assemble(
    estimates: &ReturnEstimates,
    weights: &DVector<f64>,
    objective: Objective,
    risk_free_rate: f64,
) -> OptimizationResult {
    let expected_return = estimates.portfolio_return(weights);
    let volatility = estimates.portfolio_volatility(weights);
    OptimizationResult {
        weights: PortfolioWeights::from_vector(&estimates.tickers, weights),
        expected_return,
        volatility,
        sharpe_ratio: sharpe_ratio(expected_return, volatility, risk_free_rate),
        objective,
    }
}

/// Lowest and highest portfolio return reachable under `bounds`.
///
/// Every weight starts at the minimum; the remaining budget is poured into
/// the lowest (resp. highest) returning assets first, each up to the maximum.
pub fn achievable_return_range(mean_returns: &DVector<f64>, bounds: &WeightBounds) -> (f64, f64) {
    let mut order: Vec<usize> = (0..mean_returns.len()).collect();
    order.sort_by(|&a, &b| mean_returns[a].total_cmp(&mean_returns[b]));

    let low = fill_budget(mean_returns, bounds, order.iter().copied());
    let high = fill_budget(mean_returns, bounds, order.iter().rev().copied());
    (low, high)
}

fn fill_budget(
    mean_returns: &DVector<f64>,
    bounds: &WeightBounds,
    order: impl Iterator<Item = usize>,
) -> f64 {
    let mut remaining = 1.0 - bounds.min_weight * mean_returns.len() as f64;
    let mut total = bounds.min_weight * mean_returns.sum();
    let room = bounds.max_weight - bounds.min_weight;
    for i in order {
        if remaining <= 0.0 {
            break;
        }
        let add = room.min(remaining);
        total += add * mean_returns[i];
        remaining -= add;
    }
    total
}

/// `points` evenly spaced values from `low` to `high` inclusive.
pub(crate) fn linspace(low: f64, high: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![low],
        _ => {
            let step = (high - low) / (points - 1) as f64;
            (0..points)
                .map(|i| if i == points - 1 { high } else { low + step * i as f64 })
                .collect()
        }
    }
}
