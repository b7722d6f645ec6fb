use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One event-log row as stored. The serial `id` is the ordering key and
/// respects arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub ts: DateTime<Utc>,
    pub level: String,
    pub tags: Vec<String>,
    pub symbol: Option<String>,
    pub tf: Option<String>,
    pub action: Option<String>,
    pub decision_id: Option<Uuid>,
    pub trade_id: Option<i64>,
    pub payload: Option<JsonValue>,
}
