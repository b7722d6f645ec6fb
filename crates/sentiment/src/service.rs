//! Twice-daily refresh cache over the provider chain.

use crate::chain::ProviderChain;
use chrono::{DateTime, TimeZone, Timelike, Utc};
use papertrade_core::SentimentSnapshot;
use papertrade_data::{SentimentRepository, SentimentRow};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Start of the refresh window containing `now`: 00:00 UTC in the morning
/// half of the day, 12:00 UTC in the afternoon half. A snapshot taken at
/// or after this instant is current.
#[must_use]
pub fn refresh_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let hour = if now.hour() < 12 { 0 } else { 12 };
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).expect("valid window time"))
}

/// Per-symbol sentiment with in-process caching and persistence.
///
/// Refreshes at most twice per UTC day per symbol; within a window the
/// cached (or last persisted) value is reused.
pub struct SentimentService {
    chain: ProviderChain,
    repo: SentimentRepository,
    cache: Mutex<HashMap<String, SentimentSnapshot>>,
}

impl SentimentService {
    #[must_use]
    pub fn new(chain: ProviderChain, repo: SentimentRepository) -> Self {
        Self {
            chain,
            repo,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current snapshot for `symbol`, refreshing only when the
    /// refresh boundary has been crossed since the cached value was taken.
    ///
    /// # Errors
    /// Returns an error only on persistence failures; provider failures
    /// degrade inside the chain.
    pub async fn snapshot(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<SentimentSnapshot> {
        let window_start = refresh_window_start(now);

        if let Some(cached) = self.cache.lock().get(symbol) {
            if cached.ts >= window_start {
                return Ok(cached.clone());
            }
        }

        // Cache miss or stale: another daemon run may have refreshed this
        // window already, so check the store before calling providers.
        if let Some(row) = self.repo.latest(symbol).await? {
            if row.ts >= window_start {
                let snapshot: SentimentSnapshot = row.into();
                self.cache
                    .lock()
                    .insert(symbol.to_string(), snapshot.clone());
                return Ok(snapshot);
            }
        }

        let snapshot = self.chain.fetch(symbol, now).await;
        self.repo
            .insert(&SentimentRow::from(snapshot.clone()))
            .await?;
        self.cache
            .lock()
            .insert(symbol.to_string(), snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_window_start_morning() {
        assert_eq!(refresh_window_start(at(0, 0)), at(0, 0));
        assert_eq!(refresh_window_start(at(9, 30)), at(0, 0));
        assert_eq!(refresh_window_start(at(11, 59)), at(0, 0));
    }

    #[test]
    fn test_window_start_afternoon() {
        assert_eq!(refresh_window_start(at(12, 0)), at(12, 0));
        assert_eq!(refresh_window_start(at(18, 45)), at(12, 0));
        assert_eq!(refresh_window_start(at(23, 59)), at(12, 0));
    }

    #[test]
    fn test_snapshot_from_previous_window_is_stale() {
        // Taken at 11:00, evaluated at 12:05: boundary crossed.
        let taken = at(11, 0);
        let now = at(12, 5);
        assert!(taken < refresh_window_start(now));

        // Taken at 12:30, evaluated at 23:00: same window.
        let taken = at(12, 30);
        let now = at(23, 0);
        assert!(taken >= refresh_window_start(now));
    }
}
