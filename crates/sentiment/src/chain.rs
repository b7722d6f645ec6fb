//! Ordered provider chain with a neutral last resort.

use chrono::{DateTime, Utc};
use papertrade_core::{SentimentSnapshot, SentimentSource};
use std::sync::Arc;

/// Tries each source in order; if every source fails, returns the neutral
/// snapshot so a sentiment outage can never block a cycle.
pub struct ProviderChain {
    sources: Vec<Arc<dyn SentimentSource>>,
}

impl ProviderChain {
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn SentimentSource>>) -> Self {
        Self { sources }
    }

    /// Fetches a fresh snapshot, never failing.
    pub async fn fetch(&self, symbol: &str, now: DateTime<Utc>) -> SentimentSnapshot {
        for source in &self.sources {
            match source.fetch_sentiment(symbol).await {
                Ok(snapshot) => return snapshot,
                Err(e) => {
                    tracing::warn!(symbol, "sentiment source failed, trying next: {e}");
                }
            }
        }
        tracing::warn!(symbol, "all sentiment sources failed, using neutral snapshot");
        SentimentSnapshot::neutral(symbol, now)
    }
}
