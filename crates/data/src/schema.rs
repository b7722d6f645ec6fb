//! Idempotent schema migration.
//!
//! Every table is `CREATE TABLE IF NOT EXISTS` and later column additions
//! are `ADD COLUMN IF NOT EXISTS`, so `migrate` can run on every startup
//! against any prior schema version.

use anyhow::{Context, Result};
use sqlx::PgPool;

const CREATE_TABLES: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS candles (
        symbol TEXT NOT NULL,
        tf TEXT NOT NULL,
        ts TIMESTAMPTZ NOT NULL,
        o NUMERIC NOT NULL,
        h NUMERIC NOT NULL,
        l NUMERIC NOT NULL,
        c NUMERIC NOT NULL,
        v NUMERIC NOT NULL,
        PRIMARY KEY (symbol, tf, ts)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS features (
        symbol TEXT NOT NULL,
        tf TEXT NOT NULL,
        ts TIMESTAMPTZ NOT NULL,
        ema20 DOUBLE PRECISION,
        ema50 DOUBLE PRECISION,
        ema200 DOUBLE PRECISION,
        hma55 DOUBLE PRECISION,
        rsi14 DOUBLE PRECISION,
        stochrsi DOUBLE PRECISION,
        roc10 DOUBLE PRECISION,
        atr14 DOUBLE PRECISION,
        bb_l DOUBLE PRECISION,
        bb_m DOUBLE PRECISION,
        bb_u DOUBLE PRECISION,
        donch_u DOUBLE PRECISION,
        donch_l DOUBLE PRECISION,
        obv DOUBLE PRECISION,
        cmf20 DOUBLE PRECISION,
        adx14 DOUBLE PRECISION,
        rvol20 DOUBLE PRECISION,
        vwap DOUBLE PRECISION,
        avwap DOUBLE PRECISION,
        PRIMARY KEY (symbol, tf, ts),
        FOREIGN KEY (symbol, tf, ts) REFERENCES candles (symbol, tf, ts)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS sentiment (
        symbol TEXT NOT NULL,
        ts TIMESTAMPTZ NOT NULL,
        sent_24h DOUBLE PRECISION NOT NULL,
        sent_7d DOUBLE PRECISION NOT NULL,
        sent_trend DOUBLE PRECISION NOT NULL,
        burst DOUBLE PRECISION NOT NULL,
        sources JSONB NOT NULL,
        PRIMARY KEY (symbol, ts)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS positions (
        symbol TEXT PRIMARY KEY,
        side TEXT NOT NULL,
        qty NUMERIC NOT NULL,
        avg_price NUMERIC NOT NULL,
        stop NUMERIC,
        trade_id BIGINT,
        opened_ts TIMESTAMPTZ NOT NULL,
        last_update_ts TIMESTAMPTZ NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS trades (
        id BIGSERIAL PRIMARY KEY,
        symbol TEXT NOT NULL,
        side TEXT NOT NULL,
        qty NUMERIC NOT NULL,
        entry_ts TIMESTAMPTZ NOT NULL,
        entry_px NUMERIC NOT NULL,
        exit_ts TIMESTAMPTZ,
        exit_px NUMERIC,
        fees NUMERIC NOT NULL DEFAULT 0,
        slippage_bps NUMERIC NOT NULL DEFAULT 0,
        pnl NUMERIC,
        reason TEXT
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS nav (
        ts TIMESTAMPTZ PRIMARY KEY,
        nav_usd NUMERIC NOT NULL,
        realized_pnl NUMERIC NOT NULL,
        unrealized_pnl NUMERIC NOT NULL,
        dd_pct DOUBLE PRECISION NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS event_log (
        id BIGSERIAL PRIMARY KEY,
        ts TIMESTAMPTZ NOT NULL,
        level TEXT NOT NULL,
        tags TEXT[] NOT NULL,
        symbol TEXT,
        tf TEXT,
        action TEXT,
        decision_id UUID,
        trade_id BIGINT,
        payload JSONB
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS config (
        key TEXT PRIMARY KEY,
        value JSONB NOT NULL
    )
    ",
];

// Columns added after the initial schema shipped.
const ADD_COLUMNS: &[&str] = &[
    "ALTER TABLE trades ADD COLUMN IF NOT EXISTS decision_id UUID",
    "ALTER TABLE trades ADD COLUMN IF NOT EXISTS rationale JSONB",
    "ALTER TABLE positions ADD COLUMN IF NOT EXISTS stop NUMERIC",
    "ALTER TABLE event_log ADD COLUMN IF NOT EXISTS decision_id UUID",
];

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_event_log_ts ON event_log (ts DESC)",
    "CREATE INDEX IF NOT EXISTS idx_event_log_decision ON event_log (decision_id)",
    "CREATE INDEX IF NOT EXISTS idx_trades_symbol_open ON trades (symbol) WHERE exit_ts IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_sentiment_symbol_ts ON sentiment (symbol, ts DESC)",
];

/// Applies the schema, in order: tables, column additions, indexes.
///
/// # Errors
/// Returns an error if any statement fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    for statement in CREATE_TABLES
        .iter()
        .chain(ADD_COLUMNS.iter())
        .chain(CREATE_INDEXES.iter())
    {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("migration statement failed: {statement}"))?;
    }
    tracing::debug!("schema migration complete");
    Ok(())
}
