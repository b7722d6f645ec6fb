use papertrade_core::{Candle, Regime, Side};
use papertrade_indicators::FeatureFrame;

/// A fired entry signal: side, reference entry price, and the ATR-derived
/// initial stop.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySignal {
    pub side: Side,
    pub entry: f64,
    pub stop: f64,
    pub atr: f64,
}

/// Entry predicate parameters.
#[derive(Debug, Clone, Copy)]
pub struct EntryParams {
    pub rvol_threshold: f64,
    pub atr_stop_multiplier: f64,
    pub enable_shorts: bool,
}

impl Default for EntryParams {
    fn default() -> Self {
        Self {
            rvol_threshold: 1.5,
            atr_stop_multiplier: 2.0,
            enable_shorts: false,
        }
    }
}

/// Evaluates the entry predicate on the bar at `i`.
///
/// Long: close above the exclusive Donchian upper band, positive CMF, and
/// relative volume above threshold, in a trend regime only. Short is the
/// mirror image and only evaluated when enabled.
#[must_use]
pub fn check_entry(
    frame: &FeatureFrame,
    bars: &[Candle],
    i: usize,
    regime: Regime,
    params: &EntryParams,
) -> Option<EntrySignal> {
    if regime != Regime::Trend || i >= bars.len() {
        return None;
    }

    let close = bars[i].close_f64();
    let donch_upper = frame.donch_upper[i];
    let donch_lower = frame.donch_lower[i];
    let cmf = frame.cmf20[i];
    let rvol = frame.rvol20[i];
    let atr = frame.atr14[i];
    if cmf.is_nan() || rvol.is_nan() || atr.is_nan() {
        return None;
    }

    if !donch_upper.is_nan() && close > donch_upper && cmf > 0.0 && rvol > params.rvol_threshold
    {
        return Some(EntrySignal {
            side: Side::Long,
            entry: close,
            stop: close - params.atr_stop_multiplier * atr,
            atr,
        });
    }

    if params.enable_shorts
        && !donch_lower.is_nan()
        && close < donch_lower
        && cmf < 0.0
        && rvol > params.rvol_threshold
    {
        return Some(EntrySignal {
            side: Side::Short,
            entry: close,
            stop: close + params.atr_stop_multiplier * atr,
            atr,
        });
    }

    None
}
