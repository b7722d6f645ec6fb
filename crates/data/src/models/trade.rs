use chrono::{DateTime, Utc};
use papertrade_core::{ExitReason, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One trade through its whole lifecycle. A trade is open while `exit_ts`
/// is unset and closed afterwards; `fees` accumulates both legs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradeRow {
    pub id: i64,
    pub symbol: String,
    pub side: String,
    pub qty: Decimal,
    pub entry_ts: DateTime<Utc>,
    pub entry_px: Decimal,
    pub exit_ts: Option<DateTime<Utc>>,
    pub exit_px: Option<Decimal>,
    pub fees: Decimal,
    pub slippage_bps: Decimal,
    pub pnl: Option<Decimal>,
    pub reason: Option<String>,
    pub decision_id: Option<Uuid>,
    pub rationale: Option<JsonValue>,
}

impl TradeRow {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.exit_ts.is_none()
    }

    /// Returns the parsed side.
    #[must_use]
    pub fn parsed_side(&self) -> Option<Side> {
        Side::parse(&self.side)
    }

    /// Returns the parsed exit reason, if closed.
    #[must_use]
    pub fn parsed_reason(&self) -> Option<ExitReason> {
        self.reason.as_deref().and_then(ExitReason::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_trade() -> TradeRow {
        TradeRow {
            id: 1,
            symbol: "BTC/USD".to_string(),
            side: "long".to_string(),
            qty: dec!(0.25),
            entry_ts: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            entry_px: dec!(50000),
            exit_ts: None,
            exit_px: None,
            fees: dec!(2.5),
            slippage_bps: dec!(3),
            pnl: None,
            reason: None,
            decision_id: None,
            rationale: None,
        }
    }

    #[test]
    fn test_open_until_exit_set() {
        let mut trade = sample_trade();
        assert!(trade.is_open());
        assert!(trade.parsed_reason().is_none());

        trade.exit_ts = Some(trade.entry_ts + chrono::Duration::hours(2));
        trade.reason = Some("STOP".to_string());
        assert!(!trade.is_open());
        assert_eq!(trade.parsed_reason(), Some(ExitReason::Stop));
    }
}
