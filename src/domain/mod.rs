//! Core domain: price model, strategies, simulator, metrics and optimizer.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod strategy;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod backtest;
pub mod metrics;
pub mod covariance;
mod qp;
pub mod optimizer;
pub mod frontier;
pub mod config;
pub mod error;
