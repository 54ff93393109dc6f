//! Trailing-return momentum. Tracks its own implied position so it only
//! buys when flat and only sells when long.

use crate::domain::indicator::calculate_roc;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{Action, Signal};

pub(super) fn generate(bars: &[PriceBar], window: usize) -> Vec<Signal> {
    let roc = calculate_roc(bars, window);
    let mut long = false;

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let action = match roc.simple_at(i) {
                Some(r) if r > 0.0 && !long => {
                    long = true;
                    Action::Buy
                }
                Some(r) if r <= 0.0 && long => {
                    long = false;
                    Action::Sell
                }
                _ => Action::Hold,
            };
            Signal::new(bar.date, action)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::bars_from_closes;

    #[test]
    fn alternates_with_implied_position() {
        let closes = [10.0, 11.0, 12.0, 11.0, 10.0, 11.0, 12.0];
        let actions: Vec<Action> = generate(&bars_from_closes(&closes), 2)
            .iter()
            .map(|s| s.action)
            .collect();
        use Action::*;
        assert_eq!(actions, vec![Hold, Hold, Buy, Sell, Hold, Hold, Buy]);
    }

    #[test]
    fn persistent_uptrend_buys_once() {
        let closes: Vec<f64> = (0..20).map(|i| 50.0 + i as f64).collect();
        let buys = generate(&bars_from_closes(&closes), 5)
            .iter()
            .filter(|s| s.action == Action::Buy)
            .count();
        assert_eq!(buys, 1);
    }
}
