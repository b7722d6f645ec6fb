//! Wilder directional movement index (ADX).

use crate::volatility::{true_range, wilder_smooth};
use papertrade_core::Candle;

/// Average directional index over `period` bars, in `[0, 100]`.
///
/// Directional movement and true range are Wilder-smoothed, DI+/DI- are
/// taken relative to the smoothed true range, and DX is Wilder-smoothed
/// again, so roughly `2 * period` bars pass before the first value.
#[must_use]
pub fn adx(bars: &[Candle], period: usize) -> Vec<f64> {
    let n = bars.len();
    let mut out = vec![f64::NAN; n];
    if n < 2 || period == 0 {
        return out;
    }

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];
    for i in 1..n {
        let up = bars[i].high_f64() - bars[i - 1].high_f64();
        let down = bars[i - 1].low_f64() - bars[i].low_f64();
        if up.is_nan() || down.is_nan() {
            continue;
        }
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }

    let smoothed_tr = wilder_smooth(&true_range(bars), period);
    let smoothed_plus = wilder_smooth(&plus_dm, period);
    let smoothed_minus = wilder_smooth(&minus_dm, period);

    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        let (tr, p, m) = (smoothed_tr[i], smoothed_plus[i], smoothed_minus[i]);
        if tr.is_nan() || p.is_nan() || m.is_nan() || tr == 0.0 {
            continue;
        }
        let plus_di = 100.0 * p / tr;
        let minus_di = 100.0 * m / tr;
        let di_sum = plus_di + minus_di;
        dx[i] = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };
    }

    let smoothed_dx = wilder_smooth(&dx, period);
    out.copy_from_slice(&smoothed_dx);
    out
}
