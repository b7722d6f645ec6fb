//! Pure technical-indicator functions over ordered sequences of closed bars.
//!
//! Every function returns a series of the same length as its input, with
//! leading positions where the window is not yet satisfied set to NaN.
//! Downstream logic never consumes NaN values. All functions are
//! deterministic: re-running on the same bars produces bit-identical output.

pub mod channels;
pub mod frame;
pub mod moving;
pub mod oscillators;
pub mod trend;
pub mod volatility;
pub mod volume;
pub mod vwap;

pub use channels::{donchian, DonchianChannel};
pub use frame::{FeatureFrame, FeatureSnapshot};
pub use moving::{ema, hma, sma, wma};
pub use oscillators::{roc, rsi, stoch_rsi};
pub use trend::adx;
pub use volatility::{atr, bollinger, true_range, wilder_smooth, BollingerBands};
pub use volume::{cmf, obv, rvol};
pub use vwap::{anchored_vwap, session_vwap};

/// Longest lookback in the battery (EMA 200).
pub const MAX_LOOKBACK: usize = 200;

/// Closed bars required before signals may fire.
#[must_use]
pub const fn warmup_bars() -> usize {
    3 * MAX_LOOKBACK
}

/// Index of the first position where `period` consecutive non-NaN values
/// begin, used to seed recursive smoothers past leading NaN prefixes.
pub(crate) fn first_valid_window(values: &[f64], period: usize) -> Option<usize> {
    if period == 0 || values.len() < period {
        return None;
    }
    let mut run = 0usize;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
        } else {
            run += 1;
            if run == period {
                return Some(i + 1 - period);
            }
        }
    }
    None
}
