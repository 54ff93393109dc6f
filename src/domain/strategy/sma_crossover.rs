//! Short/long simple moving average crossover.

use super::cross_action;
use crate::domain::indicator::calculate_sma;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::Signal;

pub(super) fn generate(bars: &[PriceBar], short: usize, long: usize) -> Vec<Signal> {
    let fast = calculate_sma(bars, short);
    let slow = calculate_sma(bars, long);
    let pair = |i: usize| Some((fast.simple_at(i)?, slow.simple_at(i)?));

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev = if i == 0 { None } else { pair(i - 1) };
            Signal::new(bar.date, cross_action(prev, pair(i)))
        })
        .collect()
}
