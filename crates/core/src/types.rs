use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A single OHLCV bar, immutable once the bar has closed.
///
/// Candles are keyed by `(symbol, timeframe, ts)` where `ts` is the bar's
/// open time in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub ts: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Close time of the bar (open time plus one timeframe).
    #[must_use]
    pub fn close_ts(&self) -> DateTime<Utc> {
        self.ts + self.timeframe.duration()
    }

    #[must_use]
    pub fn open_f64(&self) -> f64 {
        self.open.to_f64().unwrap_or(f64::NAN)
    }

    #[must_use]
    pub fn high_f64(&self) -> f64 {
        self.high.to_f64().unwrap_or(f64::NAN)
    }

    #[must_use]
    pub fn low_f64(&self) -> f64 {
        self.low.to_f64().unwrap_or(f64::NAN)
    }

    #[must_use]
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(f64::NAN)
    }

    #[must_use]
    pub fn volume_f64(&self) -> f64 {
        self.volume.to_f64().unwrap_or(f64::NAN)
    }
}

/// Candle interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    FourHours,
    OneDay,
}

impl Timeframe {
    /// Returns the exchange string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::FourHours => "4h",
            Self::OneDay => "1d",
        }
    }

    /// Returns the interval duration in milliseconds.
    #[must_use]
    pub const fn duration_ms(&self) -> i64 {
        match self {
            Self::OneMinute => 60_000,
            Self::FiveMinutes => 300_000,
            Self::FifteenMinutes => 900_000,
            Self::ThirtyMinutes => 1_800_000,
            Self::OneHour => 3_600_000,
            Self::FourHours => 14_400_000,
            Self::OneDay => 86_400_000,
        }
    }

    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.duration_ms())
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "30m" => Ok(Self::ThirtyMinutes),
            "1h" => Ok(Self::OneHour),
            "4h" => Ok(Self::FourHours),
            "1d" => Ok(Self::OneDay),
            _ => Err(anyhow::anyhow!(
                "Invalid timeframe: '{s}'. Valid values: 1m, 5m, 15m, 30m, 1h, 4h, 1d"
            )),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a position or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }

    /// +1 for long, -1 for short.
    #[must_use]
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => -Decimal::ONE,
        }
    }

    #[must_use]
    pub const fn sign_f64(&self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "long" => Some(Self::Long),
            "short" => Some(Self::Short),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse market-state label from ADX and EMA slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Trend,
    Chop,
}

impl Regime {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trend => "trend",
            Self::Chop => "chop",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExitReason {
    /// Protective stop was hit; fill assumed at the stop price.
    Stop,
    /// Time stop: held too long without a new extreme.
    Time,
    /// Kill-switch flattened the position during abnormal volatility.
    Kill,
    /// Defensive flatten after an invariant violation.
    Invariant,
}

impl ExitReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "STOP",
            Self::Time => "TIME",
            Self::Kill => "KILL",
            Self::Invariant => "INVARIANT",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "STOP" => Some(Self::Stop),
            "TIME" => Some(Self::Time),
            "KILL" => Some(Self::Kill),
            "INVARIANT" => Some(Self::Invariant),
            _ => None,
        }
    }
}

/// Cached sentiment reading for one symbol.
///
/// Scores are in `[-1, +1]`; `sent_trend` is `sent_24h - sent_7d`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentSnapshot {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub sent_24h: f64,
    pub sent_7d: f64,
    pub sent_trend: f64,
    pub burst: f64,
    pub sources: serde_json::Value,
}

impl SentimentSnapshot {
    /// Creates a snapshot, deriving the trend from the two horizon scores.
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        ts: DateTime<Utc>,
        sent_24h: f64,
        sent_7d: f64,
        burst: f64,
        sources: serde_json::Value,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            ts,
            sent_24h,
            sent_7d,
            sent_trend: sent_24h - sent_7d,
            burst,
            sources,
        }
    }

    /// The neutral snapshot used when every provider has failed.
    #[must_use]
    pub fn neutral(symbol: impl Into<String>, ts: DateTime<Utc>) -> Self {
        Self::new(
            symbol,
            ts,
            0.0,
            0.0,
            0.0,
            serde_json::json!({ "fallback": true }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_candle() -> Candle {
        Candle {
            symbol: "BTC/USD".to_string(),
            timeframe: Timeframe::FiveMinutes,
            ts: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100.5),
            volume: dec!(1200),
        }
    }

    #[test]
    fn test_candle_close_ts() {
        let candle = sample_candle();
        assert_eq!(
            candle.close_ts(),
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_timeframe_roundtrip() {
        for tf in [
            Timeframe::OneMinute,
            Timeframe::FiveMinutes,
            Timeframe::FifteenMinutes,
            Timeframe::ThirtyMinutes,
            Timeframe::OneHour,
            Timeframe::FourHours,
            Timeframe::OneDay,
        ] {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn test_timeframe_invalid() {
        assert!("7m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_side_sign() {
        assert_eq!(Side::Long.sign(), dec!(1));
        assert_eq!(Side::Short.sign(), dec!(-1));
        assert_eq!(Side::parse("LONG"), Some(Side::Long));
        assert_eq!(Side::parse("flat"), None);
    }

    #[test]
    fn test_exit_reason_roundtrip() {
        for reason in [
            ExitReason::Stop,
            ExitReason::Time,
            ExitReason::Kill,
            ExitReason::Invariant,
        ] {
            assert_eq!(ExitReason::parse(reason.as_str()), Some(reason));
        }
    }

    #[test]
    fn test_sentiment_trend_derived() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let snapshot = SentimentSnapshot::new("BTC/USD", ts, 0.4, 0.1, 0.2, serde_json::json!({}));
        assert!((snapshot.sent_trend - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_neutral_sentiment() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let snapshot = SentimentSnapshot::neutral("ETH/USD", ts);
        assert_eq!(snapshot.sent_24h, 0.0);
        assert_eq!(snapshot.sources["fallback"], true);
    }
}
