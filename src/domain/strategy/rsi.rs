//! RSI threshold crossings: buy on recovery from oversold, sell on the turn
//! down from overbought.

use crate::domain::indicator::calculate_rsi;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{Action, Signal};

pub(super) fn generate(
    bars: &[PriceBar],
    period: usize,
    oversold: f64,
    overbought: f64,
) -> Vec<Signal> {
    let rsi = calculate_rsi(bars, period);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev = if i == 0 { None } else { rsi.simple_at(i - 1) };
            let action = match (prev, rsi.simple_at(i)) {
                (Some(p), Some(r)) if p <= oversold && r > oversold => Action::Buy,
                (Some(p), Some(r)) if p >= overbought && r < overbought => Action::Sell,
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

    fn actions(closes: &[f64], period: usize) -> Vec<Action> {
        generate(&bars_from_closes(closes), period, 30.0, 70.0)
            .iter()
            .map(|s| s.action)
            .collect()
    }

    #[test]
    fn buy_on_oversold_recovery_sell_on_overbought_turn() {
        // RSI(2): 0 at bar 2, 50 at bar 3, 75, 87.5, then 43.75 at bar 6
        let got = actions(&[10.0, 9.0, 8.0, 9.0, 10.0, 11.0, 10.0], 2);
        use Action::*;
        assert_eq!(got, vec![Hold, Hold, Hold, Buy, Hold, Hold, Sell]);
    }

    #[test]
    fn rising_series_never_trades() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        assert!(actions(&closes, 14).iter().all(|a| *a == Action::Hold));
    }

    #[test]
    fn undefined_rsi_is_hold() {
        let got = actions(&[10.0, 5.0, 20.0], 14);
        assert_eq!(got, vec![Action::Hold; 3]);
    }
}
