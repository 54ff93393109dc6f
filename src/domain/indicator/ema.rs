//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) outputs are `None`.

/// SMA-seeded EMA over an arbitrary slice. Leading `None`s in the input are
/// skipped, so the EMA of a partially warmed-up series starts at its first value.
pub(crate) fn ema_of_partial(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut seen = 0usize;
    let mut sum = 0.0;
    let mut ema = 0.0;

    for (i, v) in values.iter().enumerate() {
        let Some(v) = v else { continue };
        seen += 1;
        if seen < period {
            sum += v;
        } else if seen == period {
            sum += v;
            ema = sum / period as f64;
            out[i] = Some(ema);
        } else {
            ema = v * k + ema * (1.0 - k);
            out[i] = Some(ema);
        }
    }
    out
}

pub(crate) fn ema_of(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    ema_of_partial(&wrapped, period)
}
