//! MACD line / signal line crossover.

use super::cross_action;
use crate::domain::indicator::calculate_macd;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::Signal;

pub(super) fn generate(bars: &[PriceBar], fast: usize, slow: usize, signal: usize) -> Vec<Signal> {
    let macd = calculate_macd(bars, fast, slow, signal);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev = if i == 0 { None } else { macd.macd_at(i - 1) };
            Signal::new(bar.date, cross_action(prev, macd.macd_at(i)))
        })
        .collect()
}
