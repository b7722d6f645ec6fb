use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use governor::{Quota, RateLimiter};
use papertrade_core::{Candle, ExchangeAdapter, Timeframe};
use rust_decimal::Decimal;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

/// Maximum candles per klines request (Binance limit).
const MAX_CANDLES_PER_REQUEST: usize = 1000;

/// Attempts per fetch before giving up.
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between retries.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Public spot market-data adapter.
pub struct BinanceSpotAdapter {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: DirectRateLimiter,
}

impl BinanceSpotAdapter {
    /// Creates an adapter against `base_url`, throttled to
    /// `rate_limit_per_second` requests.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or the rate
    /// limit is zero.
    pub fn new(base_url: &str, rate_limit_per_second: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        let per_second = NonZeroU32::new(rate_limit_per_second)
            .ok_or_else(|| anyhow!("rate limit must be > 0"))?;
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Maps "BTC/USD" style symbols to the exchange's concatenated form.
    /// USD pairs trade as USDT on spot.
    #[must_use]
    pub fn market_symbol(symbol: &str) -> String {
        let mut parts = symbol.splitn(2, '/');
        let base = parts.next().unwrap_or(symbol);
        let quote = match parts.next() {
            Some("USD") | None => "USDT",
            Some(other) => other,
        };
        format!("{base}{quote}")
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let market = Self::market_symbol(symbol);
        let limit = limit.min(MAX_CANDLES_PER_REQUEST);

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(BACKOFF_BASE * 2u32.pow(attempt - 1)).await;
            }
            self.rate_limiter.until_ready().await;

            match self
                .request_once(&url, &market, timeframe, since, limit)
                .await
            {
                Ok(klines) => {
                    let candles: Vec<Candle> = klines
                        .iter()
                        .filter_map(|kline| parse_kline(kline, symbol, timeframe))
                        .collect();
                    return Ok(candles);
                }
                Err(e) => {
                    tracing::warn!(
                        symbol,
                        attempt = attempt + 1,
                        "klines fetch failed: {e}"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("klines fetch failed")))
    }

    async fn request_once(
        &self,
        url: &str,
        market: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Vec<serde_json::Value>>> {
        let mut query: Vec<(&str, String)> = vec![
            ("symbol", market.to_string()),
            ("interval", timeframe.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(since) = since {
            query.push(("startTime", since.timestamp_millis().to_string()));
        }

        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .context("failed to send klines request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("exchange API error ({status}): {body}"));
        }

        response
            .json()
            .await
            .context("failed to parse klines response")
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceSpotAdapter {
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.fetch_klines(symbol, timeframe, None, limit).await
    }

    async fn fetch_ohlcv_since(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        self.fetch_klines(symbol, timeframe, Some(since), MAX_CANDLES_PER_REQUEST)
            .await
    }
}

/// Parses one kline array. The spot format leads with the open time and
/// OHLCV strings:
/// `[open_time, open, high, low, close, volume, close_time, ...]`.
fn parse_kline(kline: &[serde_json::Value], symbol: &str, timeframe: Timeframe) -> Option<Candle> {
    if kline.len() < 6 {
        return None;
    }

    let open_time_ms = kline[0].as_i64()?;
    let ts = Utc.timestamp_millis_opt(open_time_ms).single()?;

    Some(Candle {
        symbol: symbol.to_string(),
        timeframe,
        ts,
        open: parse_decimal(&kline[1])?,
        high: parse_decimal(&kline[2])?,
        low: parse_decimal(&kline[3])?,
        close: parse_decimal(&kline[4])?,
        volume: parse_decimal(&kline[5])?,
    })
}

/// Parses a Decimal from a JSON value (string or number).
fn parse_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).ok(),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_symbol_mapping() {
        assert_eq!(BinanceSpotAdapter::market_symbol("BTC/USD"), "BTCUSDT");
        assert_eq!(BinanceSpotAdapter::market_symbol("ETH/USDT"), "ETHUSDT");
        assert_eq!(BinanceSpotAdapter::market_symbol("SOL/EUR"), "SOLEUR");
    }

    #[test]
    fn test_parse_kline_valid() {
        let kline = vec![
            serde_json::json!(1717243200000i64),
            serde_json::json!("50000.00"),
            serde_json::json!("50100.00"),
            serde_json::json!("49900.00"),
            serde_json::json!("50050.00"),
            serde_json::json!("1000.50"),
        ];

        let candle = parse_kline(&kline, "BTC/USD", Timeframe::FiveMinutes).unwrap();
        assert_eq!(candle.symbol, "BTC/USD");
        assert_eq!(candle.timeframe, Timeframe::FiveMinutes);
        assert_eq!(candle.open, dec!(50000.00));
        assert_eq!(candle.high, dec!(50100.00));
        assert_eq!(candle.low, dec!(49900.00));
        assert_eq!(candle.close, dec!(50050.00));
        assert_eq!(candle.volume, dec!(1000.50));
    }

    #[test]
    fn test_parse_kline_short_array() {
        let kline = vec![serde_json::json!(1717243200000i64), serde_json::json!("1")];
        assert!(parse_kline(&kline, "BTC/USD", Timeframe::FiveMinutes).is_none());
    }

    #[test]
    fn test_parse_kline_bad_timestamp() {
        let kline = vec![
            serde_json::json!("nope"),
            serde_json::json!("1"),
            serde_json::json!("1"),
            serde_json::json!("1"),
            serde_json::json!("1"),
            serde_json::json!("1"),
        ];
        assert!(parse_kline(&kline, "BTC/USD", Timeframe::FiveMinutes).is_none());
    }

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(
            parse_decimal(&serde_json::json!("123.456")),
            Some(dec!(123.456))
        );
        assert!(parse_decimal(&serde_json::json!(123.5)).is_some());
        assert!(parse_decimal(&serde_json::json!(null)).is_none());
    }

    #[test]
    fn test_rejects_zero_rate_limit() {
        assert!(BinanceSpotAdapter::new("https://api.binance.com", 0).is_err());
    }
}
