//! Donchian channel.
//!
//! The window deliberately excludes the current bar: the upper band at `i`
//! is the highest high of the `period` bars before `i`, so a close above it
//! is a true breakout of prior price action.

use papertrade_core::Candle;

/// Donchian band pair; invariant `lower <= upper` wherever defined.
#[derive(Debug, Clone)]
pub struct DonchianChannel {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Rolling max-high / min-low over the previous `period` bars, exclusive of
/// the current bar. The first `period` positions are NaN.
#[must_use]
pub fn donchian(bars: &[Candle], period: usize) -> DonchianChannel {
    let n = bars.len();
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    if period == 0 {
        return DonchianChannel { upper, lower };
    }

    for i in period..n {
        let window = &bars[i - period..i];
        let mut max_high = f64::NEG_INFINITY;
        let mut min_low = f64::INFINITY;
        let mut has_nan = false;
        for bar in window {
            let high = bar.high_f64();
            let low = bar.low_f64();
            if high.is_nan() || low.is_nan() {
                has_nan = true;
                break;
            }
            max_high = max_high.max(high);
            min_low = min_low.min(low);
        }
        if !has_nan {
            upper[i] = max_high;
            lower[i] = min_low;
        }
    }

    DonchianChannel { upper, lower }
}
