//! Buy on the first bar, hold to the end. Doubles as the benchmark strategy.

use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{Action, Signal};

pub(super) fn generate(bars: &[PriceBar]) -> Vec<Signal> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                Signal::new(bar.date, Action::Buy).with_target_weight(1.0)
            } else {
                Signal::hold(bar.date)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::bars_from_closes;

    #[test]
    fn single_buy_on_first_bar() {
        let signals = generate(&bars_from_closes(&[10.0, 11.0, 9.0]));
        let actions: Vec<Action> = signals.iter().map(|s| s.action).collect();
        assert_eq!(actions, vec![Action::Buy, Action::Hold, Action::Hold]);
        assert_eq!(signals[0].target_weight, Some(1.0));
    }

    #[test]
    fn empty_input() {
        assert!(generate(&[]).is_empty());
    }
}
