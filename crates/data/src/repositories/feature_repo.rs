//! Feature repository.
//!
//! Feature rows are recomputable from candles, so upserts replace prior
//! values. The foreign key to `candles` keeps orphan feature rows out.

use crate::models::FeatureRow;
use anyhow::Result;
use sqlx::PgPool;

/// Repository for computed indicator rows.
#[derive(Debug, Clone)]
pub struct FeatureRepository {
    pool: PgPool,
}

impl FeatureRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upserts a batch of feature rows.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn upsert_batch(&self, rows: &[FeatureRow]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                r"
                INSERT INTO features
                    (symbol, tf, ts, ema20, ema50, ema200, hma55, rsi14, stochrsi, roc10,
                     atr14, bb_l, bb_m, bb_u, donch_u, donch_l, obv, cmf20, adx14, rvol20,
                     vwap, avwap)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                        $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
                ON CONFLICT (symbol, tf, ts) DO UPDATE SET
                    ema20 = EXCLUDED.ema20,
                    ema50 = EXCLUDED.ema50,
                    ema200 = EXCLUDED.ema200,
                    hma55 = EXCLUDED.hma55,
                    rsi14 = EXCLUDED.rsi14,
                    stochrsi = EXCLUDED.stochrsi,
                    roc10 = EXCLUDED.roc10,
                    atr14 = EXCLUDED.atr14,
                    bb_l = EXCLUDED.bb_l,
                    bb_m = EXCLUDED.bb_m,
                    bb_u = EXCLUDED.bb_u,
                    donch_u = EXCLUDED.donch_u,
                    donch_l = EXCLUDED.donch_l,
                    obv = EXCLUDED.obv,
                    cmf20 = EXCLUDED.cmf20,
                    adx14 = EXCLUDED.adx14,
                    rvol20 = EXCLUDED.rvol20,
                    vwap = EXCLUDED.vwap,
                    avwap = EXCLUDED.avwap
                ",
            )
            .bind(&row.symbol)
            .bind(&row.tf)
            .bind(row.ts)
            .bind(row.ema20)
            .bind(row.ema50)
            .bind(row.ema200)
            .bind(row.hma55)
            .bind(row.rsi14)
            .bind(row.stochrsi)
            .bind(row.roc10)
            .bind(row.atr14)
            .bind(row.bb_l)
            .bind(row.bb_m)
            .bind(row.bb_u)
            .bind(row.donch_u)
            .bind(row.donch_l)
            .bind(row.obv)
            .bind(row.cmf20)
            .bind(row.adx14)
            .bind(row.rvol20)
            .bind(row.vwap)
            .bind(row.avwap)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
