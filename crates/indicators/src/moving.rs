//! Moving averages: simple, weighted, exponential, and Hull.

use crate::first_valid_window;

/// Simple moving average. NaN until `period` values are available; a NaN
/// inside the window makes that position NaN.
#[must_use]
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = window.iter().sum::<f64>() / period as f64;
    }
    out
}

/// Linearly weighted moving average; the most recent value carries the
/// largest weight.
#[must_use]
pub fn wma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let denom = (period * (period + 1)) as f64 / 2.0;
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let weighted: f64 = window
            .iter()
            .enumerate()
            .map(|(k, v)| (k + 1) as f64 * v)
            .sum();
        out[i] = weighted / denom;
    }
    out
}

/// Exponential moving average with `alpha = 2 / (period + 1)`, seeded by
/// the simple mean of the first `period` values.
#[must_use]
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    let Some(start) = first_valid_window(values, period) else {
        return out;
    };

    let seed_end = start + period;
    let seed = values[start..seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end - 1] = seed;

    let alpha = 2.0 / (period as f64 + 1.0);
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

/// Hull moving average: `WMA(2 * WMA(n/2) - WMA(n), sqrt(n))`.
#[must_use]
pub fn hma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    if period < 2 || n == 0 {
        return vec![f64::NAN; n];
    }

    let half = wma(values, period / 2);
    let full = wma(values, period);
    let raw: Vec<f64> = half
        .iter()
        .zip(full.iter())
        .map(|(h, f)| {
            if h.is_nan() || f.is_nan() {
                f64::NAN
            } else {
                2.0 * h - f
            }
        })
        .collect();

    let sqrt_period = ((period as f64).sqrt().round() as usize).max(1);
    wma(&raw, sqrt_period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, EPSILON};

    #[test]
    fn test_sma_basic() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = sma(&values, 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_approx(out[2], 2.0, EPSILON);
        assert_approx(out[3], 3.0, EPSILON);
        assert_approx(out[4], 4.0, EPSILON);
    }

    #[test]
    fn test_sma_nan_in_window() {
        let values = [1.0, f64::NAN, 3.0, 4.0, 5.0];
        let out = sma(&values, 3);
        assert!(out[2].is_nan());
        assert!(out[3].is_nan());
        assert_approx(out[4], 4.0, EPSILON);
    }

    #[test]
    fn test_wma_basic() {
        let values = [1.0, 2.0, 3.0];
        let out = wma(&values, 3);
        // (1*1 + 2*2 + 3*3) / 6 = 14/6
        assert_approx(out[2], 14.0 / 6.0, EPSILON);
    }

    #[test]
    fn test_ema_seed_is_sma() {
        let values = [2.0, 4.0, 6.0, 8.0];
        let out = ema(&values, 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        // Seed = mean(2, 4, 6) = 4; alpha = 0.5
        assert_approx(out[2], 4.0, EPSILON);
        assert_approx(out[3], 0.5 * 8.0 + 0.5 * 4.0, EPSILON);
    }

    #[test]
    fn test_ema_skips_leading_nans() {
        let values = [f64::NAN, 2.0, 4.0, 6.0, 8.0];
        let out = ema(&values, 3);
        assert!(out[2].is_nan());
        assert_approx(out[3], 4.0, EPSILON);
    }

    #[test]
    fn test_hma_length_and_warmup() {
        let values: Vec<f64> = (1..=30).map(f64::from).collect();
        let out = hma(&values, 9);
        assert_eq!(out.len(), 30);
        // WMA(9) needs 9 bars, then sqrt(9)=3 more windows on top.
        assert!(out[7].is_nan());
        assert!(!out[12].is_nan());
        // On a linear ramp the Hull average tracks ahead of price history,
        // landing close to the latest value.
        assert!(out[29] > 28.0);
    }

    #[test]
    fn test_deterministic_rerun() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        assert_eq!(ema(&values, 10), ema(&values, 10));
        assert_eq!(hma(&values, 9), hma(&values, 9));
    }
}
