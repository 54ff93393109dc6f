//! Bollinger band mean reversion: enter on a close below the lower band, exit
//! on a close above the upper band.

use crate::domain::indicator::calculate_bollinger;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{Action, Signal};

pub(super) fn generate(bars: &[PriceBar], window: usize, num_std: f64) -> Vec<Signal> {
    let bands = calculate_bollinger(bars, window, num_std);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev = if i == 0 {
                None
            } else {
                bands.bollinger_at(i - 1).map(|b| (bars[i - 1].close, b))
            };
            let action = match (prev, bands.bollinger_at(i)) {
                (Some((pc, (_, _, pl))), Some((_, _, lower))) if pc >= pl && bar.close < lower => {
                    Action::Buy
                }
                (Some((pc, (pu, _, _))), Some((upper, _, _))) if pc <= pu && bar.close > upper => {
                    Action::Sell
                }
                _ => Action::Hold,
            };
            Signal::new(bar.date, action)
        })
        .collect()
}
