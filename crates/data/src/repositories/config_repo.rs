//! Key-value config repository.
//!
//! Holds daemon state that must survive restarts: starting cash, the peak
//! NAV watermark, and per-symbol kill-switch / pause flags.

use anyhow::Result;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

/// Repository for the `config` key-value table.
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    pool: PgPool,
}

impl ConfigRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the stored value for `key`, if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        let row: Option<(JsonValue,)> =
            sqlx::query_as("SELECT value FROM config WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    /// Upserts `value` under `key`.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn set(&self, key: &str, value: &JsonValue) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO config (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Removes `key` if present.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM config WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
