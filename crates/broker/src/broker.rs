//! Trade lifecycle over the persistence boundary.

use crate::fill::{entry_fill, exit_fill, fee, realized_pnl, slippage_bps};
use chrono::{DateTime, Utc};
use papertrade_core::{ExitReason, Side};
use papertrade_data::models::{PositionRow, TradeRow};
use papertrade_data::DatabaseClient;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

/// Broker failures. `PositionExists` is the atomicity guard firing: the
/// validator's no-open-position check and the position insert race, and
/// the insert loses.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("position already exists for {symbol}")]
    PositionExists { symbol: String },

    #[error("trade {trade_id} not found or already closed")]
    TradeNotFound { trade_id: i64 },

    #[error("trade {trade_id} carries unknown side '{side}'")]
    UnknownSide { trade_id: i64, side: String },

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Everything needed to open a trade at the current reference bar.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    /// Reference price (the signal bar's close).
    pub reference: Decimal,
    pub bar_high: Decimal,
    pub bar_low: Decimal,
    pub stop: Decimal,
    pub ts: DateTime<Utc>,
    pub decision_id: Uuid,
    pub rationale: JsonValue,
}

/// Fill details for an opened trade.
#[derive(Debug, Clone)]
pub struct FillReport {
    pub trade_id: i64,
    pub fill_price: Decimal,
    pub fees: Decimal,
    pub slippage_bps: Decimal,
}

/// Fill details for a closed trade.
#[derive(Debug, Clone)]
pub struct CloseReport {
    pub fill_price: Decimal,
    pub exit_fees: Decimal,
    pub pnl: Decimal,
}

/// Simulated execution engine. All fills are computed locally and written
/// atomically; no order ever leaves the process.
#[derive(Debug, Clone)]
pub struct PaperBroker {
    db: DatabaseClient,
}

impl PaperBroker {
    #[must_use]
    pub fn new(db: DatabaseClient) -> Self {
        Self { db }
    }

    /// Opens a trade and its position row in one transaction.
    ///
    /// # Errors
    /// `PositionExists` if a position row for the symbol already exists
    /// (the transaction is rolled back); `Db` on persistence failure.
    pub async fn open_trade(&self, request: &OpenRequest) -> Result<FillReport, BrokerError> {
        let slip = slippage_bps(request.bar_high, request.bar_low, request.reference);
        let fill_price = entry_fill(request.side, request.reference, slip);
        let entry_fees = fee(fill_price * request.qty);

        let mut tx = self.db.pool().begin().await?;

        let (trade_id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO trades
                (symbol, side, qty, entry_ts, entry_px, fees, slippage_bps, decision_id, rationale)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(&request.symbol)
        .bind(request.side.as_str())
        .bind(request.qty)
        .bind(request.ts)
        .bind(fill_price)
        .bind(entry_fees)
        .bind(slip)
        .bind(request.decision_id)
        .bind(&request.rationale)
        .fetch_one(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            r"
            INSERT INTO positions
                (symbol, side, qty, avg_price, stop, trade_id, opened_ts, last_update_ts)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (symbol) DO NOTHING
            ",
        )
        .bind(&request.symbol)
        .bind(request.side.as_str())
        .bind(request.qty)
        .bind(fill_price)
        .bind(request.stop)
        .bind(trade_id)
        .bind(request.ts)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(BrokerError::PositionExists {
                symbol: request.symbol.clone(),
            });
        }

        tx.commit().await?;
        tracing::info!(
            symbol = %request.symbol,
            trade_id,
            %fill_price,
            "opened {} {}",
            request.side,
            request.qty
        );

        Ok(FillReport {
            trade_id,
            fill_price,
            fees: entry_fees,
            slippage_bps: slip,
        })
    }

    /// Closes a trade: updates the trade row with exit fields and deletes
    /// the position row in one transaction. Returns realized P&L net of
    /// both legs' fees.
    ///
    /// Stop exits fill exactly at the reference (the stop price); other
    /// reasons are marketable and take slippage against the reference bar.
    ///
    /// # Errors
    /// `TradeNotFound` if the trade does not exist or is already closed;
    /// `Db` on persistence failure.
    pub async fn close_trade(
        &self,
        trade_id: i64,
        reference: Decimal,
        bar_high: Decimal,
        bar_low: Decimal,
        reason: ExitReason,
        ts: DateTime<Utc>,
    ) -> Result<CloseReport, BrokerError> {
        let mut tx = self.db.pool().begin().await?;

        let trade: Option<TradeRow> = sqlx::query_as(
            r"
            SELECT id, symbol, side, qty, entry_ts, entry_px, exit_ts, exit_px,
                   fees, slippage_bps, pnl, reason, decision_id, rationale
            FROM trades
            WHERE id = $1 AND exit_ts IS NULL
            FOR UPDATE
            ",
        )
        .bind(trade_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(trade) = trade else {
            return Err(BrokerError::TradeNotFound { trade_id });
        };
        let side = trade
            .parsed_side()
            .ok_or_else(|| BrokerError::UnknownSide {
                trade_id,
                side: trade.side.clone(),
            })?;

        let (slip, fill_price) = if reason == ExitReason::Stop {
            (Decimal::ZERO, reference)
        } else {
            let slip = slippage_bps(bar_high, bar_low, reference);
            (slip, exit_fill(side, reference, slip))
        };
        let exit_fees = fee(fill_price * trade.qty);
        let pnl = realized_pnl(side, trade.entry_px, fill_price, trade.qty, trade.fees, exit_fees);

        sqlx::query(
            r"
            UPDATE trades
            SET exit_ts = $2, exit_px = $3, fees = fees + $4,
                slippage_bps = (slippage_bps + $5) / 2, pnl = $6, reason = $7
            WHERE id = $1
            ",
        )
        .bind(trade_id)
        .bind(ts)
        .bind(fill_price)
        .bind(exit_fees)
        .bind(slip)
        .bind(pnl)
        .bind(reason.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM positions WHERE symbol = $1")
            .bind(&trade.symbol)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(
            symbol = %trade.symbol,
            trade_id,
            %fill_price,
            %pnl,
            reason = reason.as_str(),
            "closed trade"
        );

        Ok(CloseReport {
            fill_price,
            exit_fees,
            pnl,
        })
    }

    /// Unrealized P&L of an open position marked to the last close.
    #[must_use]
    pub fn mark_to_market(position: &PositionRow, last_close: Decimal) -> Decimal {
        let sign = match Side::parse(&position.side) {
            Some(side) => side.sign(),
            None => return dec!(0),
        };
        (last_close - position.avg_price) * position.qty * sign
    }
}
