//! Append-only event-log repository.

use crate::models::EventRow;
use anyhow::Result;
use papertrade_core::{EventRecord, EventTag};
use sqlx::PgPool;
use uuid::Uuid;

/// The single sink every component writes events through.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one event.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn append(&self, record: &EventRecord) -> Result<()> {
        let tags: Vec<String> = record
            .tags
            .iter()
            .map(|tag| tag.as_str().to_string())
            .collect();

        sqlx::query(
            r"
            INSERT INTO event_log (ts, level, tags, symbol, tf, action, decision_id, trade_id, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(record.ts)
        .bind(record.level.as_str())
        .bind(&tags)
        .bind(&record.symbol)
        .bind(record.timeframe.map(|tf| tf.as_str()))
        .bind(record.action.map(|action| action.as_str()))
        .bind(record.decision_id)
        .bind(record.trade_id)
        .bind(&record.payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the most recent events, newest first, optionally filtered by
    /// level and/or tag.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn recent(
        &self,
        limit: i64,
        level: Option<&str>,
        tag: Option<EventTag>,
    ) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"
            SELECT id, ts, level, tags, symbol, tf, action, decision_id, trade_id, payload
            FROM event_log
            WHERE ($2::TEXT IS NULL OR level = $2)
              AND ($3::TEXT IS NULL OR $3 = ANY(tags))
            ORDER BY id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .bind(level)
        .bind(tag.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Returns every event carrying `decision_id`, in arrival order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn by_decision(&self, decision_id: Uuid) -> Result<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"
            SELECT id, ts, level, tags, symbol, tf, action, decision_id, trade_id, payload
            FROM event_log
            WHERE decision_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(decision_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
