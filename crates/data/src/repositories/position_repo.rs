//! Position repository (reads and stop updates).
//!
//! Creating and deleting positions happens inside the broker's fill
//! transactions so the trade and position rows always change together.

use crate::models::PositionRow;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Repository for open positions.
#[derive(Debug, Clone)]
pub struct PositionRepository {
    pool: PgPool,
}

impl PositionRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns all open positions.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn all(&self) -> Result<Vec<PositionRow>> {
        let rows = sqlx::query_as::<_, PositionRow>(
            r"
            SELECT symbol, side, qty, avg_price, stop, trade_id, opened_ts, last_update_ts
            FROM positions
            ORDER BY symbol
            ",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Returns the open position for `symbol`, if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get(&self, symbol: &str) -> Result<Option<PositionRow>> {
        let row = sqlx::query_as::<_, PositionRow>(
            r"
            SELECT symbol, side, qty, avg_price, stop, trade_id, opened_ts, last_update_ts
            FROM positions
            WHERE symbol = $1
            ",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Drops a position row outside the broker's fill path. Only used by
    /// the defensive flatten after an invariant violation.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete(&self, symbol: &str) -> Result<()> {
        sqlx::query("DELETE FROM positions WHERE symbol = $1")
            .bind(symbol)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Raises or lowers the protective stop on an open position.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn update_stop(
        &self,
        symbol: &str,
        stop: Decimal,
        ts: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE positions
            SET stop = $2, last_update_ts = $3
            WHERE symbol = $1
            ",
        )
        .bind(symbol)
        .bind(stop)
        .bind(ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
