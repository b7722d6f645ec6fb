//! Candle repository.
//!
//! Candles are append-only: inserts of already-stored bars are no-ops, so
//! re-fetching overlapping windows from the exchange is always safe.

use anyhow::Result;
use chrono::{DateTime, Utc};
use papertrade_core::{Candle, Timeframe};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

#[derive(Debug, FromRow)]
struct CandleRecord {
    symbol: String,
    tf: String,
    ts: DateTime<Utc>,
    o: Decimal,
    h: Decimal,
    l: Decimal,
    c: Decimal,
    v: Decimal,
}

impl CandleRecord {
    fn into_candle(self) -> Result<Candle> {
        Ok(Candle {
            timeframe: Timeframe::from_str(&self.tf)?,
            symbol: self.symbol,
            ts: self.ts,
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
        })
    }
}

/// Repository for OHLCV bars.
#[derive(Debug, Clone)]
pub struct CandleRepository {
    pool: PgPool,
}

impl CandleRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a batch of candles, skipping bars already stored. Returns
    /// the number of newly inserted rows.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_batch(&self, candles: &[Candle]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for candle in candles {
            let result = sqlx::query(
                r"
                INSERT INTO candles (symbol, tf, ts, o, h, l, c, v)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (symbol, tf, ts) DO NOTHING
                ",
            )
            .bind(&candle.symbol)
            .bind(candle.timeframe.as_str())
            .bind(candle.ts)
            .bind(candle.open)
            .bind(candle.high)
            .bind(candle.low)
            .bind(candle.close)
            .bind(candle.volume)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Returns the most recent `limit` bars, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: i64,
    ) -> Result<Vec<Candle>> {
        let records = sqlx::query_as::<_, CandleRecord>(
            r"
            SELECT symbol, tf, ts, o, h, l, c, v
            FROM candles
            WHERE symbol = $1 AND tf = $2
            ORDER BY ts DESC
            LIMIT $3
            ",
        )
        .bind(symbol)
        .bind(timeframe.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .rev()
            .map(CandleRecord::into_candle)
            .collect()
    }

    /// Returns bars opening at or after `since`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn since(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let records = sqlx::query_as::<_, CandleRecord>(
            r"
            SELECT symbol, tf, ts, o, h, l, c, v
            FROM candles
            WHERE symbol = $1 AND tf = $2 AND ts >= $3
            ORDER BY ts ASC
            ",
        )
        .bind(symbol)
        .bind(timeframe.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(CandleRecord::into_candle).collect()
    }

    /// Returns the newest stored bar for the key, if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn latest(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<Candle>> {
        let record = sqlx::query_as::<_, CandleRecord>(
            r"
            SELECT symbol, tf, ts, o, h, l, c, v
            FROM candles
            WHERE symbol = $1 AND tf = $2
            ORDER BY ts DESC
            LIMIT 1
            ",
        )
        .bind(symbol)
        .bind(timeframe.as_str())
        .fetch_optional(&self.pool)
        .await?;

        record.map(CandleRecord::into_candle).transpose()
    }
}
