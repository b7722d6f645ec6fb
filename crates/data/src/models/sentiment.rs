use chrono::{DateTime, Utc};
use papertrade_core::SentimentSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// Persisted sentiment snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SentimentRow {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub sent_24h: f64,
    pub sent_7d: f64,
    pub sent_trend: f64,
    pub burst: f64,
    pub sources: JsonValue,
}

impl From<SentimentSnapshot> for SentimentRow {
    fn from(snapshot: SentimentSnapshot) -> Self {
        Self {
            symbol: snapshot.symbol,
            ts: snapshot.ts,
            sent_24h: snapshot.sent_24h,
            sent_7d: snapshot.sent_7d,
            sent_trend: snapshot.sent_trend,
            burst: snapshot.burst,
            sources: snapshot.sources,
        }
    }
}

impl From<SentimentRow> for SentimentSnapshot {
    fn from(row: SentimentRow) -> Self {
        Self {
            symbol: row.symbol,
            ts: row.ts,
            sent_24h: row.sent_24h,
            sent_7d: row.sent_7d,
            sent_trend: row.sent_trend,
            burst: row.burst,
            sources: row.sources,
        }
    }
}
