//! Persistent per-symbol protective state.
//!
//! Kill-switch blocks and operator pauses live in the `config` table so
//! they survive restarts. A pause is only ever cleared by the operator.

use anyhow::Result;
use chrono::{DateTime, Utc};
use papertrade_data::ConfigRepository;
use serde_json::json;

/// Per-symbol kill-switch and pause flags.
#[derive(Debug, Clone)]
pub struct KillSwitchState {
    store: ConfigRepository,
}

impl KillSwitchState {
    #[must_use]
    pub fn new(store: ConfigRepository) -> Self {
        Self { store }
    }

    fn block_key(symbol: &str) -> String {
        format!("kill_switch_until:{symbol}")
    }

    fn pause_key(symbol: &str) -> String {
        format!("paused:{symbol}")
    }

    /// True while a kill-switch block is in force for `symbol`.
    ///
    /// # Errors
    /// Returns an error on persistence failure.
    pub async fn active(&self, symbol: &str, now: DateTime<Utc>) -> Result<bool> {
        let Some(value) = self.store.get(&Self::block_key(symbol)).await? else {
            return Ok(false);
        };
        let until = value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Ok(until.is_some_and(|until| now < until))
    }

    /// Starts (or extends) a block until `until`.
    ///
    /// # Errors
    /// Returns an error on persistence failure.
    pub async fn engage(&self, symbol: &str, until: DateTime<Utc>) -> Result<()> {
        self.store
            .set(&Self::block_key(symbol), &json!(until.to_rfc3339()))
            .await
    }

    /// True when the symbol is paused pending operator reset.
    ///
    /// # Errors
    /// Returns an error on persistence failure.
    pub async fn paused(&self, symbol: &str) -> Result<bool> {
        let value = self.store.get(&Self::pause_key(symbol)).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    /// Pauses the symbol after an invariant violation.
    ///
    /// # Errors
    /// Returns an error on persistence failure.
    pub async fn pause(&self, symbol: &str) -> Result<()> {
        self.store.set(&Self::pause_key(symbol), &json!(true)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_per_symbol() {
        assert_eq!(
            KillSwitchState::block_key("BTC/USD"),
            "kill_switch_until:BTC/USD"
        );
        assert_eq!(KillSwitchState::pause_key("ETH/USD"), "paused:ETH/USD");
        assert_ne!(
            KillSwitchState::block_key("BTC/USD"),
            KillSwitchState::block_key("ETH/USD")
        );
    }
}
