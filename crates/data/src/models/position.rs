use chrono::{DateTime, Utc};
use papertrade_core::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One open position. The table is keyed by symbol, so at most one open
/// position can exist per symbol at any instant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PositionRow {
    pub symbol: String,
    pub side: String,
    pub qty: Decimal,
    pub avg_price: Decimal,
    pub stop: Option<Decimal>,
    pub trade_id: Option<i64>,
    pub opened_ts: DateTime<Utc>,
    pub last_update_ts: DateTime<Utc>,
}

impl PositionRow {
    /// Returns the parsed side.
    #[must_use]
    pub fn parsed_side(&self) -> Option<Side> {
        Side::parse(&self.side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parsed_side() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let row = PositionRow {
            symbol: "BTC/USD".to_string(),
            side: "long".to_string(),
            qty: dec!(0.5),
            avg_price: dec!(50000),
            stop: Some(dec!(48000)),
            trade_id: Some(7),
            opened_ts: ts,
            last_update_ts: ts,
        };
        assert_eq!(row.parsed_side(), Some(Side::Long));
    }
}
