//! Volume indicators: OBV, Chaikin money flow, relative volume.

use crate::moving::sma;
use papertrade_core::Candle;

/// On-balance volume. Starts at 0 and adds (subtracts) each bar's volume on
/// an up (down) close; unchanged closes carry the running total forward.
#[must_use]
pub fn obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let n = closes.len().min(volumes.len());
    let mut out = vec![f64::NAN; n];
    if n == 0 {
        return out;
    }
    out[0] = 0.0;
    for i in 1..n {
        if closes[i].is_nan() || closes[i - 1].is_nan() || volumes[i].is_nan() {
            return out;
        }
        let delta = if closes[i] > closes[i - 1] {
            volumes[i]
        } else if closes[i] < closes[i - 1] {
            -volumes[i]
        } else {
            0.0
        };
        out[i] = out[i - 1] + delta;
    }
    out
}

/// Chaikin money flow over `period` bars, in `[-1, +1]`.
///
/// `MFM = ((close - low) - (high - close)) / (high - low)`, 0 on flat bars.
#[must_use]
pub fn cmf(bars: &[Candle], period: usize) -> Vec<f64> {
    let n = bars.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let mfv: Vec<f64> = bars
        .iter()
        .map(|bar| {
            let high = bar.high_f64();
            let low = bar.low_f64();
            let close = bar.close_f64();
            let volume = bar.volume_f64();
            if high.is_nan() || low.is_nan() || close.is_nan() || volume.is_nan() {
                return f64::NAN;
            }
            if high == low {
                0.0
            } else {
                ((close - low) - (high - close)) / (high - low) * volume
            }
        })
        .collect();

    for i in (period - 1)..n {
        let mfv_window = &mfv[i + 1 - period..=i];
        if mfv_window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let vol_sum: f64 = bars[i + 1 - period..=i].iter().map(Candle::volume_f64).sum();
        if vol_sum > 0.0 {
            out[i] = mfv_window.iter().sum::<f64>() / vol_sum;
        }
    }
    out
}

/// Relative volume: current volume over its `period`-bar simple mean.
#[must_use]
pub fn rvol(volumes: &[f64], period: usize) -> Vec<f64> {
    let mean = sma(volumes, period);
    volumes
        .iter()
        .zip(mean.iter())
        .map(|(v, m)| {
            if v.is_nan() || m.is_nan() || *m == 0.0 {
                f64::NAN
            } else {
                v / m
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_approx, make_bars, EPSILON};

    #[test]
    fn test_obv_accumulates() {
        let closes = [10.0, 11.0, 10.5, 10.5, 11.5];
        let volumes = [100.0, 200.0, 150.0, 50.0, 300.0];
        let out = obv(&closes, &volumes);
        assert_approx(out[0], 0.0, EPSILON);
        assert_approx(out[1], 200.0, EPSILON);
        assert_approx(out[2], 50.0, EPSILON);
        assert_approx(out[3], 50.0, EPSILON);
        assert_approx(out[4], 350.0, EPSILON);
    }

    #[test]
    fn test_cmf_bounded() {
        let bars = make_bars(&[
            (105.0, 95.0, 104.0, 100.0),
            (108.0, 100.0, 101.0, 200.0),
            (107.0, 98.0, 106.0, 150.0),
            (109.0, 103.0, 108.0, 250.0),
        ]);
        for v in cmf(&bars, 3).iter().filter(|v| !v.is_nan()) {
            assert!(*v >= -1.0 && *v <= 1.0);
        }
    }

    #[test]
    fn test_cmf_close_at_high_is_positive() {
        // Closes pinned to the bar highs: pure accumulation.
        let bars = make_bars(&[
            (105.0, 95.0, 105.0, 100.0),
            (108.0, 100.0, 108.0, 200.0),
            (110.0, 104.0, 110.0, 150.0),
        ]);
        let out = cmf(&bars, 3);
        assert_approx(out[2], 1.0, EPSILON);
    }

    #[test]
    fn test_cmf_flat_bar_contributes_zero() {
        let bars = make_bars(&[
            (100.0, 100.0, 100.0, 500.0),
            (100.0, 100.0, 100.0, 500.0),
            (100.0, 100.0, 100.0, 500.0),
        ]);
        let out = cmf(&bars, 3);
        assert_approx(out[2], 0.0, EPSILON);
    }

    #[test]
    fn test_rvol_surge() {
        let volumes = [100.0, 100.0, 100.0, 100.0, 300.0];
        let out = rvol(&volumes, 4);
        assert!(out[2].is_nan());
        assert_approx(out[3], 1.0, EPSILON);
        // 300 / mean(100, 100, 100, 300) = 300 / 150 = 2
        assert_approx(out[4], 2.0, EPSILON);
    }
}
