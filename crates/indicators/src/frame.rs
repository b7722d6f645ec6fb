//! The full indicator battery evaluated for one symbol's bar history.

use crate::{
    channels::donchian,
    moving::{ema, hma},
    oscillators::{roc, rsi, stoch_rsi},
    trend::adx,
    volatility::{atr, bollinger},
    volume::{cmf, obv, rvol},
    vwap::{anchored_vwap, session_vwap},
};
use papertrade_core::Candle;
use serde::{Deserialize, Serialize};

/// All indicator series for one bar history, column per indicator,
/// same length as the input.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub ema20: Vec<f64>,
    pub ema50: Vec<f64>,
    pub ema200: Vec<f64>,
    pub hma55: Vec<f64>,
    pub rsi14: Vec<f64>,
    pub stochrsi: Vec<f64>,
    pub roc10: Vec<f64>,
    pub atr14: Vec<f64>,
    pub bb_lower: Vec<f64>,
    pub bb_mid: Vec<f64>,
    pub bb_upper: Vec<f64>,
    pub donch_upper: Vec<f64>,
    pub donch_lower: Vec<f64>,
    pub obv: Vec<f64>,
    pub cmf20: Vec<f64>,
    pub adx14: Vec<f64>,
    pub rvol20: Vec<f64>,
    pub vwap: Vec<f64>,
    pub avwap: Vec<f64>,
    len: usize,
}

impl FeatureFrame {
    /// Computes the whole battery over `bars` (oldest first).
    #[must_use]
    pub fn compute(bars: &[Candle]) -> Self {
        let closes: Vec<f64> = bars.iter().map(Candle::close_f64).collect();
        let volumes: Vec<f64> = bars.iter().map(Candle::volume_f64).collect();

        let channel = donchian(bars, 20);
        let bands = bollinger(&closes, 20, 2.0);
        let vwap = session_vwap(bars);
        let avwap = anchored_vwap(bars, &channel.upper, &vwap);

        Self {
            ema20: ema(&closes, 20),
            ema50: ema(&closes, 50),
            ema200: ema(&closes, 200),
            hma55: hma(&closes, 55),
            rsi14: rsi(&closes, 14),
            stochrsi: stoch_rsi(&closes, 14, 14, 3),
            roc10: roc(&closes, 10),
            atr14: atr(bars, 14),
            bb_lower: bands.lower,
            bb_mid: bands.mid,
            bb_upper: bands.upper,
            donch_upper: channel.upper,
            donch_lower: channel.lower,
            obv: obv(&closes, &volumes),
            cmf20: cmf(bars, 20),
            adx14: adx(bars, 14),
            rvol20: rvol(&volumes, 20),
            vwap,
            avwap,
            len: bars.len(),
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One row of the frame with NaN collapsed to `None`, suitable for
    /// persistence and the decision rationale.
    #[must_use]
    pub fn snapshot(&self, i: usize) -> FeatureSnapshot {
        FeatureSnapshot {
            ema20: opt(self.ema20[i]),
            ema50: opt(self.ema50[i]),
            ema200: opt(self.ema200[i]),
            hma55: opt(self.hma55[i]),
            rsi14: opt(self.rsi14[i]),
            stochrsi: opt(self.stochrsi[i]),
            roc10: opt(self.roc10[i]),
            atr14: opt(self.atr14[i]),
            bb_lower: opt(self.bb_lower[i]),
            bb_mid: opt(self.bb_mid[i]),
            bb_upper: opt(self.bb_upper[i]),
            donch_upper: opt(self.donch_upper[i]),
            donch_lower: opt(self.donch_lower[i]),
            obv: opt(self.obv[i]),
            cmf20: opt(self.cmf20[i]),
            adx14: opt(self.adx14[i]),
            rvol20: opt(self.rvol20[i]),
            vwap: opt(self.vwap[i]),
            avwap: opt(self.avwap[i]),
        }
    }
}

fn opt(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// One bar's computed indicators; `None` where the window was unsatisfied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub hma55: Option<f64>,
    pub rsi14: Option<f64>,
    pub stochrsi: Option<f64>,
    pub roc10: Option<f64>,
    pub atr14: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_mid: Option<f64>,
    pub bb_upper: Option<f64>,
    pub donch_upper: Option<f64>,
    pub donch_lower: Option<f64>,
    pub obv: Option<f64>,
    pub cmf20: Option<f64>,
    pub adx14: Option<f64>,
    pub rvol20: Option<f64>,
    pub vwap: Option<f64>,
    pub avwap: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_bars;

    fn ramp_bars(count: usize) -> Vec<Candle> {
        let data: Vec<(f64, f64, f64, f64)> = (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.3;
                (base + 1.0, base - 1.0, base + 0.5, 1000.0 + (i % 7) as f64 * 50.0)
            })
            .collect();
        make_bars(&data)
    }

    #[test]
    fn test_all_columns_same_length() {
        let bars = ramp_bars(80);
        let frame = FeatureFrame::compute(&bars);
        assert_eq!(frame.len(), 80);
        for column in [
            &frame.ema20,
            &frame.ema50,
            &frame.ema200,
            &frame.hma55,
            &frame.rsi14,
            &frame.stochrsi,
            &frame.roc10,
            &frame.atr14,
            &frame.bb_lower,
            &frame.bb_mid,
            &frame.bb_upper,
            &frame.donch_upper,
            &frame.donch_lower,
            &frame.obv,
            &frame.cmf20,
            &frame.adx14,
            &frame.rvol20,
            &frame.vwap,
            &frame.avwap,
        ] {
            assert_eq!(column.len(), 80);
        }
    }

    #[test]
    fn test_rerun_is_bit_identical() {
        let bars = ramp_bars(120);
        let a = FeatureFrame::compute(&bars);
        let b = FeatureFrame::compute(&bars);
        for (x, y) in a.atr14.iter().zip(b.atr14.iter()) {
            assert!(x.to_bits() == y.to_bits());
        }
        for (x, y) in a.adx14.iter().zip(b.adx14.iter()) {
            assert!(x.to_bits() == y.to_bits());
        }
        for (x, y) in a.avwap.iter().zip(b.avwap.iter()) {
            assert!(x.to_bits() == y.to_bits());
        }
    }

    #[test]
    fn test_snapshot_collapses_warmup_to_none() {
        let bars = ramp_bars(30);
        let frame = FeatureFrame::compute(&bars);
        let early = frame.snapshot(0);
        assert!(early.ema20.is_none());
        assert!(early.donch_upper.is_none());

        let late = frame.snapshot(29);
        assert!(late.ema20.is_some());
        assert!(late.donch_upper.is_some());
        assert!(late.ema200.is_none()); // 200-bar window never satisfied here
    }
}
