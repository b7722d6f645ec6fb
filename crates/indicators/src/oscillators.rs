//! RSI, stochastic RSI, and rate of change.

use crate::moving::sma;
use crate::volatility::wilder_smooth;

/// Wilder RSI over close prices, in `[0, 100]`.
#[must_use]
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];
    for i in 1..n {
        let delta = closes[i] - closes[i - 1];
        if delta.is_nan() {
            continue;
        }
        gains[i] = delta.max(0.0);
        losses[i] = (-delta).max(0.0);
    }

    let avg_gain = wilder_smooth(&gains, period);
    let avg_loss = wilder_smooth(&losses, period);

    let mut out = vec![f64::NAN; n];
    for i in 0..n {
        let (g, l) = (avg_gain[i], avg_loss[i]);
        if g.is_nan() || l.is_nan() {
            continue;
        }
        out[i] = if l == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + g / l)
        };
    }
    out
}

/// Stochastic RSI: the stochastic of the RSI series over `stoch_period`,
/// smoothed with an SMA of `smooth_k`, in `[0, 100]`.
#[must_use]
pub fn stoch_rsi(
    closes: &[f64],
    rsi_period: usize,
    stoch_period: usize,
    smooth_k: usize,
) -> Vec<f64> {
    let r = rsi(closes, rsi_period);
    let n = r.len();
    let mut stoch = vec![f64::NAN; n];
    if stoch_period == 0 {
        return stoch;
    }

    for i in 0..n {
        if i + 1 < stoch_period {
            continue;
        }
        let window = &r[i + 1 - stoch_period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let lo = window.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Flat RSI window: no directional information, report midpoint.
        stoch[i] = if hi == lo {
            50.0
        } else {
            100.0 * (r[i] - lo) / (hi - lo)
        };
    }

    sma(&stoch, smooth_k)
}

/// Rate of change over `period` bars, in percent.
#[must_use]
pub fn roc(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    for i in period..n {
        let base = closes[i - period];
        if base.is_nan() || closes[i].is_nan() || base == 0.0 {
            continue;
        }
        out[i] = 100.0 * (closes[i] - base) / base;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, EPSILON};

    #[test]
    fn test_rsi_all_gains_is_100() {
        let closes: Vec<f64> = (1..=10).map(f64::from).collect();
        let out = rsi(&closes, 3);
        assert!(out[2].is_nan());
        assert_approx(out[3], 100.0, EPSILON);
        assert_approx(out[9], 100.0, EPSILON);
    }

    #[test]
    fn test_rsi_bounded() {
        let closes = [10.0, 11.0, 9.5, 10.5, 9.0, 10.0, 11.5, 11.0, 12.0, 10.5];
        for v in rsi(&closes, 4).iter().filter(|v| !v.is_nan()) {
            assert!(*v >= 0.0 && *v <= 100.0);
        }
    }

    #[test]
    fn test_rsi_known_value() {
        let closes = [10.0, 11.0, 10.0, 11.0];
        let out = rsi(&closes, 3);
        // Deltas: +1, -1, +1 -> avg_gain = 2/3, avg_loss = 1/3
        // RS = 2, RSI = 100 - 100/3
        assert_approx(out[3], 100.0 - 100.0 / 3.0, EPSILON);
    }

    #[test]
    fn test_stoch_rsi_bounded() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.5).sin() * 3.0)
            .collect();
        for v in stoch_rsi(&closes, 14, 14, 3).iter().filter(|v| !v.is_nan()) {
            assert!(*v >= 0.0 && *v <= 100.0);
        }
    }

    #[test]
    fn test_roc_basic() {
        let closes = [100.0, 101.0, 102.0, 110.0];
        let out = roc(&closes, 3);
        assert!(out[2].is_nan());
        assert_approx(out[3], 10.0, EPSILON);
    }
}
