//! Trade repository (ledger reads).
//!
//! Inserting and closing trades happens inside the broker's fill
//! transactions; this repository serves the orchestrator's reads.

use crate::models::TradeRow;
use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::PgPool;

const TRADE_COLUMNS: &str = "id, symbol, side, qty, entry_ts, entry_px, exit_ts, exit_px, \
                             fees, slippage_bps, pnl, reason, decision_id, rationale";

/// Repository for the trade ledger.
#[derive(Debug, Clone)]
pub struct TradeRepository {
    pool: PgPool,
}

impl TradeRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a trade by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get(&self, id: i64) -> Result<Option<TradeRow>> {
        let row = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {TRADE_COLUMNS} FROM trades WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Returns the open trade for `symbol`, if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn open_trade(&self, symbol: &str) -> Result<Option<TradeRow>> {
        let row = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {TRADE_COLUMNS} FROM trades \
             WHERE symbol = $1 AND exit_ts IS NULL \
             ORDER BY entry_ts DESC LIMIT 1"
        ))
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Returns every open trade for `symbol` (more than one is an
    /// invariant violation the orchestrator must handle).
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn open_trades(&self, symbol: &str) -> Result<Vec<TradeRow>> {
        let rows = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {TRADE_COLUMNS} FROM trades \
             WHERE symbol = $1 AND exit_ts IS NULL \
             ORDER BY entry_ts ASC"
        ))
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Returns the most recently closed trade for `symbol`, if any. Used
    /// for the post-stop-out cooldown window.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn last_closed(&self, symbol: &str) -> Result<Option<TradeRow>> {
        let row = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {TRADE_COLUMNS} FROM trades \
             WHERE symbol = $1 AND exit_ts IS NOT NULL \
             ORDER BY exit_ts DESC LIMIT 1"
        ))
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Sum of realized P&L over all closed trades.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn total_realized_pnl(&self) -> Result<Decimal> {
        let row: (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(pnl), 0) FROM trades WHERE pnl IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }
}
