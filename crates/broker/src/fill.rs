//! Pure fill arithmetic: slippage, fees, and realized P&L.

use papertrade_core::Side;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fee per leg in basis points of notional.
const FEE_BPS: Decimal = dec!(2);

/// Slippage floor in basis points.
const MIN_SLIP_BPS: Decimal = dec!(3);

/// Range sensitivity: bps of slippage per percent of bar range.
const RANGE_SLIP_FACTOR: Decimal = dec!(15);

const BPS_DENOMINATOR: Decimal = dec!(10000);

/// Slippage for a fill against the reference bar:
/// `max(3, 15 * range_pct)` bps where `range_pct = 100 * (high - low) / close`.
#[must_use]
pub fn slippage_bps(high: Decimal, low: Decimal, close: Decimal) -> Decimal {
    if close <= Decimal::ZERO {
        return MIN_SLIP_BPS;
    }
    let range_pct = (high - low) / close * dec!(100);
    (RANGE_SLIP_FACTOR * range_pct).max(MIN_SLIP_BPS)
}

/// Entry fill: buys pay up, sells (short entries) give up.
#[must_use]
pub fn entry_fill(side: Side, reference: Decimal, slip_bps: Decimal) -> Decimal {
    let slip = reference * slip_bps / BPS_DENOMINATOR;
    match side {
        Side::Long => reference + slip,
        Side::Short => reference - slip,
    }
}

/// Exit fill: the adverse direction mirrors the entry.
#[must_use]
pub fn exit_fill(side: Side, reference: Decimal, slip_bps: Decimal) -> Decimal {
    let slip = reference * slip_bps / BPS_DENOMINATOR;
    match side {
        Side::Long => reference - slip,
        Side::Short => reference + slip,
    }
}

/// Fee for one leg: 2 bps of notional.
#[must_use]
pub fn fee(notional: Decimal) -> Decimal {
    notional.abs() * FEE_BPS / BPS_DENOMINATOR
}

/// Realized P&L over a round trip, net of both legs' fees:
/// `(exit - entry) * qty * side_sign - entry_fees - exit_fees`.
#[must_use]
pub fn realized_pnl(
    side: Side,
    entry_fill: Decimal,
    exit_fill: Decimal,
    qty: Decimal,
    entry_fees: Decimal,
    exit_fees: Decimal,
) -> Decimal {
    (exit_fill - entry_fill) * qty * side.sign() - entry_fees - exit_fees
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slippage_floor() {
        // Tight bar: 0.1% range gives 1.5 bps, floored to 3.
        assert_eq!(slippage_bps(dec!(100.05), dec!(99.95), dec!(100)), dec!(3));
    }

    #[test]
    fn test_slippage_scales_with_range() {
        // 2% range: 15 * 2 = 30 bps.
        assert_eq!(slippage_bps(dec!(101), dec!(99), dec!(100)), dec!(30));
    }

    #[test]
    fn test_slippage_degenerate_close() {
        assert_eq!(slippage_bps(dec!(1), dec!(0.5), dec!(0)), dec!(3));
    }

    #[test]
    fn test_entry_fill_directions() {
        // 10 bps on a 100 reference.
        assert_eq!(entry_fill(Side::Long, dec!(100), dec!(10)), dec!(100.10));
        assert_eq!(entry_fill(Side::Short, dec!(100), dec!(10)), dec!(99.90));
    }

    #[test]
    fn test_exit_fill_mirrors_entry() {
        assert_eq!(exit_fill(Side::Long, dec!(100), dec!(10)), dec!(99.90));
        assert_eq!(exit_fill(Side::Short, dec!(100), dec!(10)), dec!(100.10));
    }

    #[test]
    fn test_fee_is_2bps() {
        assert_eq!(fee(dec!(10000)), dec!(2));
        assert_eq!(fee(dec!(-10000)), dec!(2));
    }

    #[test]
    fn test_realized_pnl_long_round_trip() {
        // Long 25 @ 100 filled, out at 98; fees 0.5 each leg.
        let pnl = realized_pnl(Side::Long, dec!(100), dec!(98), dec!(25), dec!(0.5), dec!(0.49));
        assert_eq!(pnl, dec!(-50) - dec!(0.5) - dec!(0.49));
    }

    #[test]
    fn test_realized_pnl_short_round_trip() {
        let pnl = realized_pnl(Side::Short, dec!(100), dec!(98), dec!(25), dec!(0.5), dec!(0.49));
        assert_eq!(pnl, dec!(50) - dec!(0.5) - dec!(0.49));
    }

    #[test]
    fn test_breakout_entry_fill_shape() {
        // Reference close 100.5, bar range 0.3%: raw slip 4.5 bps beats
        // the floor.
        let slip = slippage_bps(dec!(100.65), dec!(100.3485), dec!(100.5));
        assert!(slip > dec!(3));
        let fill = entry_fill(Side::Long, dec!(100.5), slip);
        assert_eq!(fill, dec!(100.5) * (Decimal::ONE + slip / dec!(10000)));
    }
}
