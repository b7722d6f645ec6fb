use chrono::{DateTime, Utc};
use papertrade_indicators::FeatureSnapshot;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Computed indicators for one bar. Keyed identically to its candle and
/// rebuildable from candles at any time; a feature row never exists without
/// its underlying candle (enforced by foreign key).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeatureRow {
    pub symbol: String,
    pub tf: String,
    pub ts: DateTime<Utc>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub hma55: Option<f64>,
    pub rsi14: Option<f64>,
    pub stochrsi: Option<f64>,
    pub roc10: Option<f64>,
    pub atr14: Option<f64>,
    pub bb_l: Option<f64>,
    pub bb_m: Option<f64>,
    pub bb_u: Option<f64>,
    pub donch_u: Option<f64>,
    pub donch_l: Option<f64>,
    pub obv: Option<f64>,
    pub cmf20: Option<f64>,
    pub adx14: Option<f64>,
    pub rvol20: Option<f64>,
    pub vwap: Option<f64>,
    pub avwap: Option<f64>,
}

impl FeatureRow {
    /// Builds a row from an indicator snapshot for one bar.
    #[must_use]
    pub fn from_snapshot(
        symbol: &str,
        tf: &str,
        ts: DateTime<Utc>,
        snapshot: &FeatureSnapshot,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            tf: tf.to_string(),
            ts,
            ema20: snapshot.ema20,
            ema50: snapshot.ema50,
            ema200: snapshot.ema200,
            hma55: snapshot.hma55,
            rsi14: snapshot.rsi14,
            stochrsi: snapshot.stochrsi,
            roc10: snapshot.roc10,
            atr14: snapshot.atr14,
            bb_l: snapshot.bb_lower,
            bb_m: snapshot.bb_mid,
            bb_u: snapshot.bb_upper,
            donch_u: snapshot.donch_upper,
            donch_l: snapshot.donch_lower,
            obv: snapshot.obv,
            cmf20: snapshot.cmf20,
            adx14: snapshot.adx14,
            rvol20: snapshot.rvol20,
            vwap: snapshot.vwap,
            avwap: snapshot.avwap,
        }
    }
}
