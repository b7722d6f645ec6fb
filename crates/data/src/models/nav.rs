use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One NAV snapshot. Snapshots are derived from the trade ledger and live
/// positions at snapshot time and are never edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NavRow {
    pub ts: DateTime<Utc>,
    pub nav_usd: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    /// Drawdown from peak NAV as a fraction in [0, 1).
    pub dd_pct: f64,
}
