use rust_decimal::Decimal;

/// Sizing parameters as fractions of NAV.
#[derive(Debug, Clone, Copy)]
pub struct SizingParams {
    pub risk_per_trade: Decimal,
    pub max_exposure_per_symbol: Decimal,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            risk_per_trade: Decimal::new(5, 3),             // 0.005
            max_exposure_per_symbol: Decimal::new(2, 2),    // 0.02
        }
    }
}

/// Risk-based position size.
///
/// `qty = (risk_per_trade * nav) / |entry - stop|`, clamped so the notional
/// stays within the per-symbol exposure cap, rounded to 8 decimal places.
/// Returns `None` when the inputs are degenerate or the quantity rounds to
/// zero.
#[must_use]
pub fn position_size(
    nav: Decimal,
    entry: Decimal,
    stop: Decimal,
    params: &SizingParams,
) -> Option<Decimal> {
    if nav <= Decimal::ZERO || entry <= Decimal::ZERO {
        return None;
    }
    let price_risk = (entry - stop).abs();
    if price_risk == Decimal::ZERO {
        return None;
    }

    let risk_qty = params.risk_per_trade * nav / price_risk;
    let max_qty = params.max_exposure_per_symbol * nav / entry;
    let qty = risk_qty.min(max_qty).round_dp(8);

    if qty <= Decimal::ZERO {
        None
    } else {
        Some(qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_risk_quantity_when_under_cap() {
        // Wide stop: risk sizing stays under the exposure cap.
        // risk qty = 50 / 30 = 1.666..., cap = 200 / 100 = 2.
        let qty = position_size(dec!(10000), dec!(100), dec!(70), &SizingParams::default())
            .unwrap();
        assert_eq!(qty, (dec!(50) / dec!(30)).round_dp(8));
    }

    #[test]
    fn test_exposure_cap_clamps_tight_stops() {
        // Tight stop: raw risk qty would be 25, notional 2512.50 on a
        // 10k NAV. The 2% cap wins.
        let qty = position_size(dec!(10000), dec!(100.5), dec!(98.5), &SizingParams::default())
            .unwrap();
        assert_eq!(qty, (dec!(200) / dec!(100.5)).round_dp(8));
        assert!(qty * dec!(100.5) <= dec!(200.0000001));
    }

    #[test]
    fn test_zero_distance_rejected() {
        assert!(position_size(dec!(10000), dec!(100), dec!(100), &SizingParams::default())
            .is_none());
    }

    #[test]
    fn test_zero_nav_rejected() {
        assert!(position_size(dec!(0), dec!(100), dec!(98), &SizingParams::default()).is_none());
    }

    #[test]
    fn test_dust_quantity_rejected() {
        let params = SizingParams {
            risk_per_trade: dec!(0.000000000001),
            max_exposure_per_symbol: dec!(0.000000000001),
        };
        assert!(position_size(dec!(1), dec!(100000), dec!(99999), &params).is_none());
    }

    #[test]
    fn test_short_side_symmetric() {
        // Stop above entry (short): |entry - stop| drives the size the
        // same way.
        let long = position_size(dec!(10000), dec!(100), dec!(70), &SizingParams::default());
        let short = position_size(dec!(10000), dec!(100), dec!(130), &SizingParams::default());
        assert_eq!(long, short);
    }
}
