//! Sentiment snapshot repository.

use crate::models::SentimentRow;
use anyhow::Result;
use sqlx::PgPool;

/// Repository for persisted sentiment snapshots.
#[derive(Debug, Clone)]
pub struct SentimentRepository {
    pool: PgPool,
}

impl SentimentRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a snapshot; a duplicate `(symbol, ts)` key is a no-op.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert(&self, row: &SentimentRow) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO sentiment (symbol, ts, sent_24h, sent_7d, sent_trend, burst, sources)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (symbol, ts) DO NOTHING
            ",
        )
        .bind(&row.symbol)
        .bind(row.ts)
        .bind(row.sent_24h)
        .bind(row.sent_7d)
        .bind(row.sent_trend)
        .bind(row.burst)
        .bind(&row.sources)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the latest snapshot for `symbol`, if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn latest(&self, symbol: &str) -> Result<Option<SentimentRow>> {
        let row = sqlx::query_as::<_, SentimentRow>(
            r"
            SELECT symbol, ts, sent_24h, sent_7d, sent_trend, burst, sources
            FROM sentiment
            WHERE symbol = $1
            ORDER BY ts DESC
            LIMIT 1
            ",
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
