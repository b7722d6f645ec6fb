//! True range, ATR, and Bollinger bands.
//!
//! ATR uses Wilder smoothing (EMA with alpha = 1/period) over the true-range
//! series, seeded by the mean of the first `period` values. TR at index 0 has
//! no previous close and is left NaN, so the seed forms one bar later.

use crate::{first_valid_window, moving::sma};
use papertrade_core::Candle;

/// True range series.
/// `TR[t] = max(high - low, |high - prev_close|, |low - prev_close|)`;
/// index 0 is NaN (no previous close).
#[must_use]
pub fn true_range(bars: &[Candle]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];
    for i in 1..n {
        let high = bars[i].high_f64();
        let low = bars[i].low_f64();
        let prev_close = bars[i - 1].close_f64();
        if high.is_nan() || low.is_nan() || prev_close.is_nan() {
            continue;
        }
        tr[i] = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
    }
    tr
}

/// Wilder smoothing with `alpha = 1 / period`, seeded by the mean of the
/// first `period` consecutive valid values.
#[must_use]
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    let Some(start) = first_valid_window(values, period) else {
        return out;
    };

    let seed_end = start + period;
    let seed = values[start..seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            return out;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

/// Average true range. Strictly positive once the warm-up is satisfied.
#[must_use]
pub fn atr(bars: &[Candle], period: usize) -> Vec<f64> {
    wilder_smooth(&true_range(bars), period)
}

/// Bollinger band triple; invariant `lower <= mid <= upper` wherever the
/// window is satisfied.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub lower: Vec<f64>,
    pub mid: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Bollinger bands: SMA(period) with `mult` population standard deviations
/// on each side.
#[must_use]
pub fn bollinger(values: &[f64], period: usize, mult: f64) -> BollingerBands {
    let n = values.len();
    let mid = sma(values, period);
    let mut lower = vec![f64::NAN; n];
    let mut upper = vec![f64::NAN; n];

    if period == 0 || n < period {
        return BollingerBands { lower, mid, upper };
    }

    for i in (period - 1)..n {
        if mid[i].is_nan() {
            continue;
        }
        let window = &values[i + 1 - period..=i];
        let variance =
            window.iter().map(|v| (v - mid[i]).powi(2)).sum::<f64>() / period as f64;
        let sd = variance.sqrt();
        lower[i] = mid[i] - mult * sd;
        upper[i] = mid[i] + mult * sd;
    }

    BollingerBands { lower, mid, upper }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, make_bars, EPSILON};

    #[test]
    fn test_true_range_basic() {
        let bars = make_bars(&[
            (105.0, 95.0, 102.0, 1.0),
            (108.0, 100.0, 106.0, 1.0), // max(8, 6, 2) = 8
            (107.0, 98.0, 99.0, 1.0),   // max(9, 1, 8) = 9
        ]);
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 8.0, EPSILON);
        assert_approx(tr[2], 9.0, EPSILON);
    }

    #[test]
    fn test_true_range_gap() {
        // Gap up: previous close 100, bar range 108..115.
        let bars = make_bars(&[(102.0, 97.0, 100.0, 1.0), (115.0, 108.0, 112.0, 1.0)]);
        let tr = true_range(&bars);
        assert_approx(tr[1], 15.0, EPSILON);
    }

    #[test]
    fn test_atr_seed_and_recursion() {
        let bars = make_bars(&[
            (105.0, 95.0, 102.0, 1.0),  // TR NaN
            (108.0, 100.0, 106.0, 1.0), // TR 8
            (107.0, 98.0, 99.0, 1.0),   // TR 9
            (103.0, 97.0, 101.0, 1.0),  // TR 6
            (106.0, 100.0, 105.0, 1.0), // TR 6
        ]);
        let out = atr(&bars, 3);
        assert!(out[2].is_nan());
        // Seed at index 3: mean(8, 9, 6) = 23/3
        assert_approx(out[3], 23.0 / 3.0, EPSILON);
        // ATR[4] = (1/3)*6 + (2/3)*(23/3) = 64/9
        assert_approx(out[4], 64.0 / 9.0, EPSILON);
    }

    #[test]
    fn test_atr_positive_after_warmup() {
        let bars = make_bars(&[
            (101.0, 99.0, 100.0, 1.0),
            (102.0, 100.0, 101.0, 1.0),
            (103.0, 101.0, 102.0, 1.0),
            (104.0, 102.0, 103.0, 1.0),
            (105.0, 103.0, 104.0, 1.0),
        ]);
        for v in atr(&bars, 3).iter().filter(|v| !v.is_nan()) {
            assert!(*v > 0.0);
        }
    }

    #[test]
    fn test_bollinger_ordering() {
        let values = [10.0, 12.0, 11.0, 13.0, 12.0, 14.0, 13.0];
        let bands = bollinger(&values, 5, 2.0);
        for i in 0..values.len() {
            if bands.mid[i].is_nan() {
                assert!(bands.lower[i].is_nan() && bands.upper[i].is_nan());
            } else {
                assert!(bands.lower[i] <= bands.mid[i]);
                assert!(bands.mid[i] <= bands.upper[i]);
            }
        }
    }

    #[test]
    fn test_bollinger_known_values() {
        let values = [2.0, 4.0, 6.0];
        let bands = bollinger(&values, 3, 2.0);
        // mid = 4, population sd = sqrt(8/3)
        let sd = (8.0f64 / 3.0).sqrt();
        assert_approx(bands.mid[2], 4.0, EPSILON);
        assert_approx(bands.lower[2], 4.0 - 2.0 * sd, EPSILON);
        assert_approx(bands.upper[2], 4.0 + 2.0 * sd, EPSILON);
    }
}
