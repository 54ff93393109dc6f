//! Efficient frontier: minimum-variance portfolios at evenly spaced target
//! returns between the lowest and highest achievable return.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::covariance::{estimate_returns, AssetUniverse, ReturnEstimates};
use super::error::MarketsenseError;
use super::optimizer::{
    achievable_return_range, linspace, min_variance_weights, OptimizerConfig, WeightBounds,
    FLAT_RETURN_RANGE,
};

/// Volatility may dip by this much past the GMV point and still count as monotonic.
const MONOTONIC_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub target_return: f64,
    pub expected_return: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficientFrontier {
    pub points: Vec<FrontierPoint>,
    /// Volatility never decreases once returns pass the minimum-variance
    /// point. Reported, not enforced.
    pub monotonic: bool,
}

pub fn efficient_frontier(
    universe: &AssetUniverse,
    points: usize,
    bounds: &WeightBounds,
    lookback_days: usize,
    config: &OptimizerConfig,
) -> Result<EfficientFrontier, MarketsenseError> {
    bounds.check_feasible(universe.len())?;
    let estimates = estimate_returns(universe, lookback_days, config.trading_days_per_year)?;
    frontier_from_estimates(&estimates, points, bounds)
}

/// Target solves run in parallel and are collected in target order.
/// Targets the solver cannot meet are skipped.
pub fn frontier_from_estimates(
    estimates: &ReturnEstimates,
    points: usize,
    bounds: &WeightBounds,
) -> Result<EfficientFrontier, MarketsenseError> {
    bounds.check_feasible(estimates.len())?;

    let (low, high) = achievable_return_range(&estimates.mean_returns, bounds);
    let points = if high - low < FLAT_RETURN_RANGE {
        solve_targets(estimates, bounds, &linspace(low, low, points.min(1)), false)
    } else {
        solve_targets(estimates, bounds, &linspace(low, high, points), true)
    };

    let monotonic = is_monotonic_past_minimum(&points);
    if !monotonic {
        warn!("efficient frontier volatility decreases past the minimum-variance point");
    }
    Ok(EfficientFrontier { points, monotonic })
}

/// One minimum-variance solve per target, in target order. Unconstrained
/// solves ignore the target value. Failed targets leave no point behind.
fn solve_targets(
    estimates: &ReturnEstimates,
    bounds: &WeightBounds,
    targets: &[f64],
    constrained: bool,
) -> Vec<FrontierPoint> {
    let solved: Vec<Option<FrontierPoint>> = targets
        .par_iter()
        .map(|&target| {
            let constraint = constrained.then_some(target);
            match min_variance_weights(estimates, bounds, constraint) {
                Ok(w) => Some(FrontierPoint {
                    target_return: target,
                    expected_return: estimates.portfolio_return(&w),
                    volatility: estimates.portfolio_volatility(&w),
                }),
                Err(MarketsenseError::InfeasibleConstraints { reason }) => {
                    debug!(target, %reason, "frontier target infeasible");
                    None
                }
                Err(e) => {
                    warn!(target, error = %e, "frontier target failed");
                    None
                }
            }
        })
        .collect();

    solved.into_iter().flatten().collect()
}

fn is_monotonic_past_minimum(points: &[FrontierPoint]) -> bool {
    let Some(gmv) = points
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.volatility.total_cmp(&b.1.volatility))
        .map(|(i, _)| i)
    else {
        return true;
    };
    points[gmv..]
        .windows(2)
        .all(|w| w[1].volatility >= w[0].volatility - MONOTONIC_TOLERANCE)
}
