//! Contracts for the daemon's external collaborators.
//!
//! The cycle orchestrator only sees these traits; concrete adapters live in
//! their own crates and are wired together at startup.

use crate::types::{Candle, SentimentSnapshot, Timeframe};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Public market-data source. Implementations must throttle themselves to
/// the exchange's rate limit.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Fetches the most recent `limit` closed bars, oldest first.
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>>;

    /// Fetches bars opening at or after `since`, oldest first.
    async fn fetch_ohlcv_since(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: DateTime<Utc>,
    ) -> Result<Vec<Candle>>;
}

/// One backend in the sentiment provider chain.
#[async_trait]
pub trait SentimentSource: Send + Sync {
    /// Fetches a fresh sentiment reading for `symbol`.
    async fn fetch_sentiment(&self, symbol: &str) -> Result<SentimentSnapshot>;
}

/// Errors from the LLM transport layer.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Non-success HTTP status from the completion endpoint.
    #[error("completion API error ({status}): {body}")]
    Http { status: u16, body: String },

    /// The call exceeded its deadline.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// Connection-level failure.
    #[error("transport failure: {0}")]
    Network(String),

    /// The model's reply was not the JSON document the schema requires.
    #[error("model returned invalid JSON: {0}")]
    InvalidJson(String),
}

/// Chat-completion transport. The core enforces schema validity and
/// deadlines; retries across models are the caller's concern.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Sends one completion request and returns the model's reply parsed as
    /// a JSON document.
    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, TransportError>;
}
