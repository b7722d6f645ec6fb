//! NAV snapshot repository.

use crate::models::NavRow;
use anyhow::Result;
use sqlx::PgPool;

/// Repository for NAV snapshots.
#[derive(Debug, Clone)]
pub struct NavRepository {
    pool: PgPool,
}

impl NavRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends a snapshot. The timestamp key keeps the series strictly
    /// monotonic; a duplicate timestamp is a no-op.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert(&self, row: &NavRow) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO nav (ts, nav_usd, realized_pnl, unrealized_pnl, dd_pct)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (ts) DO NOTHING
            ",
        )
        .bind(row.ts)
        .bind(row.nav_usd)
        .bind(row.realized_pnl)
        .bind(row.unrealized_pnl)
        .bind(row.dd_pct)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the latest snapshot, if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn latest(&self) -> Result<Option<NavRow>> {
        let row = sqlx::query_as::<_, NavRow>(
            r"
            SELECT ts, nav_usd, realized_pnl, unrealized_pnl, dd_pct
            FROM nav
            ORDER BY ts DESC
            LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
