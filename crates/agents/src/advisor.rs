//! The advisor agent: deterministic signal in, typed proposal out.

use crate::proposal::{Proposal, ProposalError};
use papertrade_core::{LlmTransport, Regime, SentimentSnapshot, Side, TransportError};
use papertrade_indicators::FeatureSnapshot;
use rust_decimal::Decimal;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The open-position summary the agents see.
#[derive(Debug, Clone)]
pub struct PositionSummary {
    pub side: Side,
    pub qty: Decimal,
    pub avg_price: Decimal,
}

/// Everything the advisor is shown for one decision.
#[derive(Debug, Clone)]
pub struct AdvisorContext {
    pub symbol: String,
    pub regime: Regime,
    pub signal_side: Side,
    pub features: FeatureSnapshot,
    pub sentiment: Option<SentimentSnapshot>,
    pub position: Option<PositionSummary>,
    /// Risk caps the advisor is reminded it cannot exceed.
    pub risk_per_trade: f64,
    pub max_exposure: f64,
}

/// Advisor failure after both models were tried.
#[derive(Error, Debug)]
#[error("advisor failed on primary ({primary}) and fallback ({fallback})")]
pub struct AdvisorError {
    pub primary: String,
    pub fallback: String,
}

/// Proposal-generating agent with a primary model and a single
/// fallback-model retry.
pub struct Advisor {
    transport: Arc<dyn LlmTransport>,
    primary_model: String,
    fallback_model: String,
    timeout: Duration,
}

impl Advisor {
    #[must_use]
    pub fn new(
        transport: Arc<dyn LlmTransport>,
        primary_model: impl Into<String>,
        fallback_model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            primary_model: primary_model.into(),
            fallback_model: fallback_model.into(),
            timeout,
        }
    }

    /// Requests a proposal, retrying once on the fallback model after an
    /// HTTP error, timeout, or schema-invalid reply.
    ///
    /// # Errors
    /// Returns `AdvisorError` when both models fail; the caller skips the
    /// entry for this cycle.
    pub async fn propose(&self, ctx: &AdvisorContext) -> Result<Proposal, AdvisorError> {
        let primary_failure = match self.call(&self.primary_model, ctx).await {
            Ok(proposal) => return Ok(proposal),
            Err(detail) => detail,
        };
        tracing::warn!(
            symbol = %ctx.symbol,
            model = %self.primary_model,
            "advisor primary model failed ({primary_failure}), trying fallback"
        );

        match self.call(&self.fallback_model, ctx).await {
            Ok(proposal) => Ok(proposal),
            Err(fallback_failure) => Err(AdvisorError {
                primary: primary_failure,
                fallback: fallback_failure,
            }),
        }
    }

    async fn call(&self, model: &str, ctx: &AdvisorContext) -> Result<Proposal, String> {
        let reply = self
            .transport
            .complete(
                model,
                SYSTEM_PROMPT,
                &build_prompt(ctx),
                self.timeout,
            )
            .await
            .map_err(|e: TransportError| e.to_string())?;

        Proposal::from_json(reply).map_err(|e: ProposalError| e.to_string())
    }
}

const SYSTEM_PROMPT: &str = "You are an expert cryptocurrency trading advisor. Analyze the \
provided market data and respond with a single JSON object, no additional text:\n\
{\n\
  \"symbol\": string,\n\
  \"side\": \"long\" | \"short\" | \"flat\",\n\
  \"confidence\": number in [0, 1],\n\
  \"reasons\": array of up to 3 short strings,\n\
  \"entry\": { \"type\": \"market\" },\n\
  \"stop\": { \"type\": \"atr\", \"multiplier\": number > 0 },\n\
  \"take_profit\": { \"rr\": number > 0 },\n\
  \"max_hold_bars\": integer > 0\n\
}\n\
You refine confidence and rationale only; prices, sizes, and P&L are \
computed elsewhere and any other field shape is rejected.";

fn build_prompt(ctx: &AdvisorContext) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Symbol: {}", ctx.symbol);
    let _ = writeln!(prompt, "Market regime: {}", ctx.regime);
    let _ = writeln!(prompt, "Deterministic signal: {}", ctx.signal_side);
    let _ = writeln!(
        prompt,
        "Risk caps: {:.2}% risk per trade, {:.2}% max exposure",
        ctx.risk_per_trade * 100.0,
        ctx.max_exposure * 100.0
    );

    let features =
        serde_json::to_string_pretty(&ctx.features).unwrap_or_else(|_| "{}".to_string());
    let _ = writeln!(prompt, "\nTechnical snapshot:\n{features}");

    if let Some(sentiment) = &ctx.sentiment {
        let _ = writeln!(
            prompt,
            "\nSentiment: 24h {:.2}, 7d {:.2}, trend {:.2}, burst {:.2}",
            sentiment.sent_24h, sentiment.sent_7d, sentiment.sent_trend, sentiment.burst
        );
    }

    match &ctx.position {
        Some(position) => {
            let _ = writeln!(
                prompt,
                "\nCurrent position: {} {} @ {}",
                position.side, position.qty, position.avg_price
            );
        }
        None => {
            let _ = writeln!(prompt, "\nCurrent position: none");
        }
    }

    prompt.push_str("\nProvide your trading recommendation as JSON.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use papertrade_core::TransportError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> AdvisorContext {
        AdvisorContext {
            symbol: "BTC/USD".to_string(),
            regime: Regime::Trend,
            signal_side: Side::Long,
            features: FeatureSnapshot::default(),
            sentiment: None,
            position: None,
            risk_per_trade: 0.005,
            max_exposure: 0.02,
        }
    }

    fn valid_reply() -> serde_json::Value {
        json!({
            "symbol": "BTC/USD",
            "side": "long",
            "confidence": 0.8,
            "reasons": ["breakout"],
            "entry": { "type": "market" },
            "stop": { "type": "atr", "multiplier": 2.0 },
            "take_profit": { "rr": 2.0 },
            "max_hold_bars": 40
        })
    }

    /// Transport that answers per-model from a fixed table.
    struct ScriptedTransport {
        primary: Result<serde_json::Value, ()>,
        fallback: Result<serde_json::Value, ()>,
        calls: AtomicUsize,
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            let slot = if model == "primary" {
                &self.primary
            } else {
                &self.fallback
            };
            slot.clone().map_err(|()| TransportError::Timeout(timeout))
        }
    }

    fn advisor(transport: ScriptedTransport) -> (Advisor, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        (
            Advisor::new(
                transport.clone(),
                "primary",
                "fallback",
                Duration::from_secs(5),
            ),
            transport,
        )
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let (advisor, transport) = advisor(ScriptedTransport {
            primary: Ok(valid_reply()),
            fallback: Err(()),
            calls: AtomicUsize::new(0),
        });
        let proposal = advisor.propose(&context()).await.unwrap();
        assert_eq!(proposal.symbol, "BTC/USD");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_after_primary_timeout() {
        let (advisor, transport) = advisor(ScriptedTransport {
            primary: Err(()),
            fallback: Ok(valid_reply()),
            calls: AtomicUsize::new(0),
        });
        let proposal = advisor.propose(&context()).await.unwrap();
        assert_eq!(proposal.confidence, 0.8);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_schema_invalid_reply_triggers_fallback() {
        let (advisor, transport) = advisor(ScriptedTransport {
            primary: Ok(json!({ "side": "long" })),
            fallback: Ok(valid_reply()),
            calls: AtomicUsize::new(0),
        });
        assert!(advisor.propose(&context()).await.is_ok());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_both_models_failing_is_an_error() {
        let (advisor, _) = advisor(ScriptedTransport {
            primary: Err(()),
            fallback: Ok(json!("not a proposal")),
            calls: AtomicUsize::new(0),
        });
        let error = advisor.propose(&context()).await.unwrap_err();
        assert!(error.primary.contains("timed out"));
    }

    #[test]
    fn test_prompt_mentions_position_and_caps() {
        let mut ctx = context();
        ctx.position = Some(PositionSummary {
            side: Side::Long,
            qty: Decimal::new(5, 1),
            avg_price: Decimal::new(50_000, 0),
        });
        let prompt = build_prompt(&ctx);
        assert!(prompt.contains("Current position: long 0.5 @ 50000"));
        assert!(prompt.contains("0.50% risk per trade"));
    }
}
