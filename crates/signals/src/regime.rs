use papertrade_core::Regime;
use papertrade_indicators::FeatureFrame;

/// Classifies the bar at `i` as trending or choppy.
///
/// `trend` requires ADX(14) above 20 and EMA50 above EMA200; anything else,
/// including unsatisfied indicator windows, is `chop`.
#[must_use]
pub fn classify_regime(frame: &FeatureFrame, i: usize) -> Regime {
    if i >= frame.len() {
        return Regime::Chop;
    }
    let adx = frame.adx14[i];
    let ema50 = frame.ema50[i];
    let ema200 = frame.ema200[i];
    if adx.is_nan() || ema50.is_nan() || ema200.is_nan() {
        return Regime::Chop;
    }
    if adx > 20.0 && ema50 > ema200 {
        Regime::Trend
    } else {
        Regime::Chop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use papertrade_core::{Candle, Timeframe};
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;

    fn bars(count: usize, step: f64) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let price = 100.0 + i as f64 * step;
                Candle {
                    symbol: "TEST/USD".to_string(),
                    timeframe: Timeframe::FiveMinutes,
                    ts: base + chrono::Duration::minutes(5 * i as i64),
                    open: Decimal::from_f64(price).unwrap(),
                    high: Decimal::from_f64(price + 1.0).unwrap(),
                    low: Decimal::from_f64(price - 1.0).unwrap(),
                    close: Decimal::from_f64(price + 0.5).unwrap(),
                    volume: Decimal::from_f64(1000.0).unwrap(),
                }
            })
            .collect()
    }

    #[test]
    fn test_steady_uptrend_classifies_trend() {
        let bars = bars(260, 0.5);
        let frame = FeatureFrame::compute(&bars);
        assert_eq!(classify_regime(&frame, bars.len() - 1), Regime::Trend);
    }

    #[test]
    fn test_warmup_classifies_chop() {
        // Too few bars for EMA200: regime must stay chop.
        let bars = bars(60, 0.5);
        let frame = FeatureFrame::compute(&bars);
        assert_eq!(classify_regime(&frame, bars.len() - 1), Regime::Chop);
    }

    #[test]
    fn test_out_of_range_index_is_chop() {
        let bars = bars(10, 0.5);
        let frame = FeatureFrame::compute(&bars);
        assert_eq!(classify_regime(&frame, 99), Regime::Chop);
    }
}
