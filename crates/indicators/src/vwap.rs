//! Session and anchored volume-weighted average price.

use chrono::Datelike;
use papertrade_core::Candle;

fn typical_price(bar: &Candle) -> f64 {
    (bar.high_f64() + bar.low_f64() + bar.close_f64()) / 3.0
}

/// Session VWAP: cumulative typical-price VWAP resetting at each UTC
/// session boundary (00:00).
#[must_use]
pub fn session_vwap(bars: &[Candle]) -> Vec<f64> {
    let n = bars.len();
    let mut out = vec![f64::NAN; n];
    let mut cum_pv = 0.0;
    let mut cum_v = 0.0;
    let mut session: Option<(i32, u32, u32)> = None;

    for (i, bar) in bars.iter().enumerate() {
        let date = bar.ts.date_naive();
        let key = (date.year(), date.month(), date.day());
        if session != Some(key) {
            session = Some(key);
            cum_pv = 0.0;
            cum_v = 0.0;
        }

        let tp = typical_price(bar);
        let volume = bar.volume_f64();
        if tp.is_nan() || volume.is_nan() {
            continue;
        }
        cum_pv += tp * volume;
        cum_v += volume;
        if cum_v > 0.0 {
            out[i] = cum_pv / cum_v;
        }
    }
    out
}

/// VWAP anchored at the most recent Donchian-upper breakout bar.
///
/// The anchor resets every time a close exceeds the (exclusive) upper band;
/// bars before the first breakout carry the session VWAP so the series is
/// always defined alongside it.
#[must_use]
pub fn anchored_vwap(bars: &[Candle], donchian_upper: &[f64], session: &[f64]) -> Vec<f64> {
    let n = bars.len();
    let mut out = vec![f64::NAN; n];
    let mut anchored = false;
    let mut cum_pv = 0.0;
    let mut cum_v = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let close = bar.close_f64();
        let upper = donchian_upper.get(i).copied().unwrap_or(f64::NAN);
        if !upper.is_nan() && close > upper {
            // New breakout: re-anchor here.
            anchored = true;
            cum_pv = 0.0;
            cum_v = 0.0;
        }

        if anchored {
            let tp = typical_price(bar);
            let volume = bar.volume_f64();
            if !tp.is_nan() && !volume.is_nan() {
                cum_pv += tp * volume;
                cum_v += volume;
            }
            if cum_v > 0.0 {
                out[i] = cum_pv / cum_v;
            }
        } else {
            out[i] = session.get(i).copied().unwrap_or(f64::NAN);
        }
    }
    out
}
