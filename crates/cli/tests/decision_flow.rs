//! End-to-end decision pipeline over synthetic bars: deterministic signal,
//! advisor proposal, consultant review, reconciliation, validation, and
//! fill arithmetic, with the LLM transport mocked out.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use papertrade_agents::{
    reconcile, Advisor, AdvisorContext, Consultant, MarketContext, Recommendation, ReviewOutcome,
    VolatilityBand,
};
use papertrade_broker::{entry_fill, fee, slippage_bps};
use papertrade_core::{Candle, LlmTransport, Regime, Side, Timeframe, TransportError};
use papertrade_indicators::{warmup_bars, FeatureFrame};
use papertrade_orchestrator::{validate, RejectReason, ValidationContext};
use papertrade_signals::entry::EntryParams;
use papertrade_signals::sizing::SizingParams;
use papertrade_signals::{check_entry, classify_regime, position_size};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// A slow uptrend whose closes stay inside the recent range, ending in a
/// heavy-volume breakout bar.
fn breakout_series() -> Vec<Candle> {
    let base_ts = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let count = warmup_bars() + 20;
    let mut bars = Vec::with_capacity(count + 1);

    for i in 0..count {
        let close = 100.0 + i as f64 * 0.01;
        bars.push(candle(
            base_ts + chrono::Duration::minutes(5 * i as i64),
            close + 0.5,
            close - 0.5,
            close,
            1000.0,
        ));
    }
    let last_close = 100.0 + (count - 1) as f64 * 0.01;
    bars.push(candle(
        base_ts + chrono::Duration::minutes(5 * count as i64),
        last_close + 2.2,
        last_close + 0.3,
        last_close + 2.0,
        5000.0,
    ));
    bars
}

fn candle(ts: chrono::DateTime<Utc>, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    Candle {
        symbol: "BTC/USD".to_string(),
        timeframe: Timeframe::FiveMinutes,
        ts,
        open: Decimal::from_f64(close).unwrap(),
        high: Decimal::from_f64(high).unwrap(),
        low: Decimal::from_f64(low).unwrap(),
        close: Decimal::from_f64(close).unwrap(),
        volume: Decimal::from_f64(volume).unwrap(),
    }
}

struct ScriptedTransport {
    advisor_reply: serde_json::Value,
    consultant_reply: Option<serde_json::Value>,
}

#[async_trait]
impl LlmTransport for ScriptedTransport {
    async fn complete(
        &self,
        model: &str,
        _system_prompt: &str,
        _user_prompt: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, TransportError> {
        if model == "reviewer" {
            self.consultant_reply
                .clone()
                .ok_or(TransportError::Timeout(timeout))
        } else {
            Ok(self.advisor_reply.clone())
        }
    }
}

fn advisor_reply() -> serde_json::Value {
    json!({
        "symbol": "BTC/USD",
        "side": "long",
        "confidence": 0.75,
        "reasons": ["breakout above range", "volume expansion"],
        "entry": { "type": "market" },
        "stop": { "type": "atr", "multiplier": 2.0 },
        "take_profit": { "rr": 2.0 },
        "max_hold_bars": 40
    })
}

#[tokio::test]
async fn test_breakout_flows_to_an_approved_entry() {
    let bars = breakout_series();
    assert!(bars.len() >= warmup_bars());

    let frame = FeatureFrame::compute(&bars);
    let i = bars.len() - 1;

    let regime = classify_regime(&frame, i);
    assert_eq!(regime, Regime::Trend, "steady uptrend must classify trend");

    let signal = check_entry(&frame, &bars, i, regime, &EntryParams::default())
        .expect("breakout bar must fire the entry predicate");
    assert_eq!(signal.side, Side::Long);

    let nav = dec!(10000);
    let entry = bars[i].close;
    let stop = Decimal::from_f64(signal.stop).unwrap();
    let qty = position_size(nav, entry, stop, &SizingParams::default())
        .expect("sizing must produce a quantity");
    assert!(qty * entry <= dec!(0.02) * nav + dec!(0.0000001));

    let transport = Arc::new(ScriptedTransport {
        advisor_reply: advisor_reply(),
        consultant_reply: Some(json!({
            "recommendation": "approve",
            "concerns": [],
            "modifications": null,
            "confidence": 0.9,
            "reasoning": "Clean breakout with volume confirmation."
        })),
    });
    let advisor = Advisor::new(transport.clone(), "primary", "fallback", Duration::from_secs(5));
    let consultant = Consultant::new(transport, "reviewer", Duration::from_secs(10));

    let ctx = AdvisorContext {
        symbol: "BTC/USD".to_string(),
        regime,
        signal_side: signal.side,
        features: frame.snapshot(i),
        sentiment: None,
        position: None,
        risk_per_trade: 0.005,
        max_exposure: 0.02,
    };
    let proposal = advisor.propose(&ctx).await.expect("advisor must succeed");

    let market_context = MarketContext {
        regime,
        sentiment_24h: 0.2,
        sentiment_trend: 0.1,
        volatility_band: VolatilityBand::from_atr_pct(signal.atr / signal.entry),
    };
    let result = consultant.review(&proposal, &market_context).await;
    assert!(!result.auto_approved);
    assert_eq!(result.review.recommendation, Recommendation::Approve);

    let outcome = reconcile(&result.review, signal.side, signal.entry, signal.atr, qty);
    assert_eq!(outcome, ReviewOutcome::Approve);

    let validation = ValidationContext {
        regime,
        side: signal.side,
        qty,
        entry,
        stop,
        nav,
        max_exposure_per_symbol: dec!(0.02),
        risk_per_trade: dec!(0.005),
        position_exists: false,
        kill_switch_active: false,
        cooldown_active: false,
        paused: false,
        schema_valid: proposal.validate().is_ok(),
    };
    assert!(validate(&validation).is_ok());

    // Fill arithmetic against the signal bar.
    let slip = slippage_bps(bars[i].high, bars[i].low, entry);
    assert!(slip >= dec!(3));
    let fill = entry_fill(signal.side, entry, slip);
    assert!(fill > entry, "a long entry pays the slippage");
    assert_eq!(fee(fill * qty), (fill * qty).abs() * dec!(2) / dec!(10000));
}

#[tokio::test]
async fn test_consultant_size_cut_still_validates() {
    let bars = breakout_series();
    let frame = FeatureFrame::compute(&bars);
    let i = bars.len() - 1;
    let regime = classify_regime(&frame, i);
    let signal = check_entry(&frame, &bars, i, regime, &EntryParams::default()).unwrap();

    let nav = dec!(10000);
    let entry = bars[i].close;
    let stop = Decimal::from_f64(signal.stop).unwrap();
    let qty = position_size(nav, entry, stop, &SizingParams::default()).unwrap();

    let transport = Arc::new(ScriptedTransport {
        advisor_reply: advisor_reply(),
        consultant_reply: Some(json!({
            "recommendation": "modify",
            "concerns": ["late in the move"],
            "modifications": { "size": 0.5 },
            "confidence": 0.6,
            "reasoning": "Halve the size after the extended run."
        })),
    });
    let advisor = Advisor::new(transport.clone(), "primary", "fallback", Duration::from_secs(5));
    let consultant = Consultant::new(transport, "reviewer", Duration::from_secs(10));

    let ctx = AdvisorContext {
        symbol: "BTC/USD".to_string(),
        regime,
        signal_side: signal.side,
        features: frame.snapshot(i),
        sentiment: None,
        position: None,
        risk_per_trade: 0.005,
        max_exposure: 0.02,
    };
    let proposal = advisor.propose(&ctx).await.unwrap();
    let result = consultant
        .review(
            &proposal,
            &MarketContext {
                regime,
                sentiment_24h: 0.0,
                sentiment_trend: 0.0,
                volatility_band: VolatilityBand::Normal,
            },
        )
        .await;

    let outcome = reconcile(&result.review, signal.side, signal.entry, signal.atr, qty);
    let (modified, modified_stop) = match outcome {
        ReviewOutcome::Modify { qty, stop, .. } => (qty, stop),
        other => panic!("size reduction must survive reconciliation, got {other:?}"),
    };
    assert_eq!(modified_stop, None);
    let modified = modified.expect("size modification present");
    assert!(modified < qty);

    // The validator re-checks the caps on the modified quantity.
    let validation = ValidationContext {
        regime,
        side: signal.side,
        qty: modified,
        entry,
        stop,
        nav,
        max_exposure_per_symbol: dec!(0.02),
        risk_per_trade: dec!(0.005),
        position_exists: false,
        kill_switch_active: false,
        cooldown_active: false,
        paused: false,
        schema_valid: true,
    };
    assert!(validate(&validation).is_ok());
}

#[tokio::test]
async fn test_consultant_timeout_auto_approves_the_trade() {
    let bars = breakout_series();
    let frame = FeatureFrame::compute(&bars);
    let i = bars.len() - 1;
    let regime = classify_regime(&frame, i);
    let signal = check_entry(&frame, &bars, i, regime, &EntryParams::default()).unwrap();

    let transport = Arc::new(ScriptedTransport {
        advisor_reply: advisor_reply(),
        consultant_reply: None, // reviewer times out
    });
    let advisor = Advisor::new(transport.clone(), "primary", "fallback", Duration::from_secs(5));
    let consultant = Consultant::new(transport, "reviewer", Duration::from_secs(10));

    let ctx = AdvisorContext {
        symbol: "BTC/USD".to_string(),
        regime,
        signal_side: signal.side,
        features: frame.snapshot(i),
        sentiment: None,
        position: None,
        risk_per_trade: 0.005,
        max_exposure: 0.02,
    };
    let proposal = advisor.propose(&ctx).await.unwrap();
    let result = consultant
        .review(
            &proposal,
            &MarketContext {
                regime,
                sentiment_24h: 0.0,
                sentiment_trend: 0.0,
                volatility_band: VolatilityBand::Normal,
            },
        )
        .await;

    assert!(result.auto_approved);
    let outcome = reconcile(&result.review, signal.side, signal.entry, signal.atr, dec!(1));
    assert_eq!(outcome, ReviewOutcome::Approve, "auto-approval still trades");
}

#[tokio::test]
async fn test_chop_regime_is_rejected_even_with_eager_agents() {
    // Validator gate: a long proposal in chop never reaches the broker.
    let validation = ValidationContext {
        regime: Regime::Chop,
        side: Side::Long,
        qty: dec!(1),
        entry: dec!(100),
        stop: dec!(98),
        nav: dec!(10000),
        max_exposure_per_symbol: dec!(0.02),
        risk_per_trade: dec!(0.005),
        position_exists: false,
        kill_switch_active: false,
        cooldown_active: false,
        paused: false,
        schema_valid: true,
    };
    assert_eq!(validate(&validation), Err(RejectReason::RegimeMismatch));
}
