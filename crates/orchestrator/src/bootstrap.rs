//! First-run bootstrap: schema, starting cash, and the candle warm-up.

use crate::nav::NavEngine;
use anyhow::Result;
use chrono::{DateTime, Utc};
use papertrade_core::{
    AppConfig, EventAction, EventRecord, EventTag, ExchangeAdapter, Timeframe,
};
use papertrade_data::{
    CandleRepository, ConfigRepository, DatabaseClient, EventRepository, NavRepository,
    PositionRepository, TradeRepository,
};
use rust_decimal::Decimal;

/// Backstop on warm-up pagination; far beyond any real history depth.
const MAX_WARMUP_PAGES: usize = 500;

/// Initializes the daemon: idempotent migration, starting-cash record,
/// seed NAV snapshot, and historical candles for every configured symbol.
///
/// # Errors
/// Returns an error on persistence failure or when the exchange cannot
/// deliver the warm-up history.
pub async fn initialize(
    db: &DatabaseClient,
    exchange: &dyn ExchangeAdapter,
    config: &AppConfig,
    starting_cash: Decimal,
    now: DateTime<Utc>,
) -> Result<()> {
    db.migrate().await?;

    let timeframe: Timeframe = config.trading.timeframe.parse()?;
    let pool = db.pool().clone();
    let nav_engine = NavEngine {
        candles: CandleRepository::new(pool.clone()),
        positions: PositionRepository::new(pool.clone()),
        trades: TradeRepository::new(pool.clone()),
        nav: NavRepository::new(pool.clone()),
        store: ConfigRepository::new(pool.clone()),
        timeframe,
    };
    nav_engine.initialize(starting_cash, now).await?;

    let events = EventRepository::new(pool.clone());
    events
        .append(
            &EventRecord::info(EventTag::Cycle)
                .with_action(EventAction::InitializeNav)
                .with_payload(serde_json::json!({ "nav": starting_cash.to_string() })),
        )
        .await?;
    tracing::info!(%starting_cash, "initialized NAV");

    let candles = CandleRepository::new(pool);
    for symbol in &config.trading.symbols {
        let loaded = warm_up_symbol(&candles, exchange, symbol, timeframe, config, now).await?;
        tracing::info!(%symbol, loaded, "warm-up history loaded");
    }

    Ok(())
}

/// Pages history from `warmup_days` ago to now, inserting idempotently.
async fn warm_up_symbol(
    candles: &CandleRepository,
    exchange: &dyn ExchangeAdapter,
    symbol: &str,
    timeframe: Timeframe,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<u64> {
    let mut cursor = now - chrono::Duration::days(config.trading.warmup_days);
    let mut loaded = 0u64;

    for _ in 0..MAX_WARMUP_PAGES {
        let batch = exchange
            .fetch_ohlcv_since(symbol, timeframe, cursor)
            .await?;
        let Some(last) = batch.last() else {
            break;
        };
        let next_cursor = last.ts + timeframe.duration();
        loaded += candles.insert_batch(&batch).await?;
        if next_cursor >= now || batch.len() < 2 {
            break;
        }
        cursor = next_cursor;
    }

    Ok(loaded)
}
