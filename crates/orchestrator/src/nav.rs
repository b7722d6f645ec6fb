//! NAV accounting.
//!
//! `nav = starting_cash + realized + unrealized`, where realized sums the
//! closed-trade ledger and unrealized marks open positions to their last
//! stored close. The snapshot is derived, appended, and never edited;
//! `peak_nav` is a persistent watermark that only rises.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use papertrade_broker::PaperBroker;
use papertrade_core::Timeframe;
use papertrade_data::{
    CandleRepository, ConfigRepository, NavRepository, NavRow, PositionRepository,
    TradeRepository,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

const INITIAL_NAV_KEY: &str = "initial_nav";
const PEAK_NAV_KEY: &str = "peak_nav";

/// Drawdown from peak as a fraction; zero when the peak is degenerate.
#[must_use]
pub fn drawdown_pct(peak: Decimal, nav: Decimal) -> f64 {
    if peak <= Decimal::ZERO {
        return 0.0;
    }
    ((peak - nav) / peak).to_f64().unwrap_or(0.0).max(0.0)
}

/// Computes and persists one NAV snapshot.
#[derive(Clone)]
pub struct NavEngine {
    pub candles: CandleRepository,
    pub positions: PositionRepository,
    pub trades: TradeRepository,
    pub nav: NavRepository,
    pub store: ConfigRepository,
    pub timeframe: Timeframe,
}

impl NavEngine {
    /// Records the starting cash and the seed snapshot. Called once by
    /// `init`.
    ///
    /// # Errors
    /// Returns an error on persistence failure.
    pub async fn initialize(&self, starting_cash: Decimal, now: DateTime<Utc>) -> Result<()> {
        self.store
            .set(INITIAL_NAV_KEY, &serde_json::json!(starting_cash.to_string()))
            .await?;
        self.store
            .set(PEAK_NAV_KEY, &serde_json::json!(starting_cash.to_string()))
            .await?;
        self.nav
            .insert(&NavRow {
                ts: now,
                nav_usd: starting_cash,
                realized_pnl: Decimal::ZERO,
                unrealized_pnl: Decimal::ZERO,
                dd_pct: 0.0,
            })
            .await
    }

    /// The configured starting cash.
    ///
    /// # Errors
    /// Returns an error if the daemon was never initialized.
    pub async fn starting_cash(&self) -> Result<Decimal> {
        let value = self
            .store
            .get(INITIAL_NAV_KEY)
            .await?
            .context("no starting cash recorded; run init first")?;
        let text = value
            .as_str()
            .context("starting cash is not a decimal string")?;
        Decimal::from_str(text).context("starting cash does not parse")
    }

    /// Computes the snapshot for `now`, persists it, and advances the peak
    /// watermark when a new high is made.
    ///
    /// # Errors
    /// Returns an error on persistence failure or missing initialization.
    pub async fn snapshot(&self, now: DateTime<Utc>) -> Result<NavRow> {
        let starting_cash = self.starting_cash().await?;
        let realized = self.trades.total_realized_pnl().await?;

        let mut unrealized = Decimal::ZERO;
        for position in self.positions.all().await? {
            match self.candles.latest(&position.symbol, self.timeframe).await? {
                Some(candle) => {
                    unrealized += PaperBroker::mark_to_market(&position, candle.close);
                }
                None => {
                    tracing::warn!(
                        symbol = %position.symbol,
                        "no stored candle to mark position, skipping"
                    );
                }
            }
        }

        let nav_usd = starting_cash + realized + unrealized;

        let peak = match self.store.get(PEAK_NAV_KEY).await? {
            Some(value) => value
                .as_str()
                .and_then(|s| Decimal::from_str(s).ok())
                .unwrap_or(starting_cash),
            None => starting_cash,
        };
        let peak = if nav_usd > peak {
            self.store
                .set(PEAK_NAV_KEY, &serde_json::json!(nav_usd.to_string()))
                .await?;
            nav_usd
        } else {
            peak
        };

        let row = NavRow {
            ts: now,
            nav_usd,
            realized_pnl: realized,
            unrealized_pnl: unrealized,
            dd_pct: drawdown_pct(peak, nav_usd),
        };
        self.nav.insert(&row).await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_drawdown_basic() {
        assert_eq!(drawdown_pct(dec!(10000), dec!(9000)), 0.1);
        assert_eq!(drawdown_pct(dec!(10000), dec!(10000)), 0.0);
    }

    #[test]
    fn test_drawdown_above_peak_clamps_to_zero() {
        // Snapshot races can hand a nav above the stored peak; drawdown
        // never goes negative.
        assert_eq!(drawdown_pct(dec!(10000), dec!(10500)), 0.0);
    }

    #[test]
    fn test_drawdown_degenerate_peak() {
        assert_eq!(drawdown_pct(dec!(0), dec!(100)), 0.0);
        assert_eq!(drawdown_pct(dec!(-5), dec!(100)), 0.0);
    }
}
