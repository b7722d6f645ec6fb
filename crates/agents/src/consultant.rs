//! The consultant agent: independent second opinion on a proposal.
//!
//! The consultant never blocks trading. Timeout, transport failure, or an
//! unusable reply all fall back to auto-approval, flagged so the event log
//! records that no real review happened.

use crate::proposal::Proposal;
use papertrade_core::{LlmTransport, Regime};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Approve,
    Reject,
    Modify,
}

/// Allowed modification fields; anything else in the reply is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Modifications {
    /// Absolute stop price.
    pub stop: Option<f64>,
    /// Replacement quantity; may only reduce the proposal's size.
    pub size: Option<f64>,
}

/// The consultant's reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultantReview {
    pub recommendation: Recommendation,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub modifications: Option<Modifications>,
    pub confidence: f64,
    pub reasoning: String,
}

impl ConsultantReview {
    /// The review used when the consultant cannot be reached.
    #[must_use]
    pub fn auto_approve(reason: &str) -> Self {
        Self {
            recommendation: Recommendation::Approve,
            concerns: vec![format!("auto-approved: {reason}")],
            modifications: None,
            confidence: 0.5,
            reasoning: format!("Consultant unavailable ({reason}); proposal approved unchanged."),
        }
    }
}

/// Coarse volatility label shown to the consultant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityBand {
    Low,
    Normal,
    High,
    Extreme,
}

impl VolatilityBand {
    /// Classifies ATR as a fraction of price.
    #[must_use]
    pub fn from_atr_pct(atr_pct: f64) -> Self {
        if atr_pct < 0.005 {
            Self::Low
        } else if atr_pct < 0.015 {
            Self::Normal
        } else if atr_pct < 0.03 {
            Self::High
        } else {
            Self::Extreme
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }
}

/// Market context accompanying the proposal under review.
#[derive(Debug, Clone)]
pub struct MarketContext {
    pub regime: Regime,
    pub sentiment_24h: f64,
    pub sentiment_trend: f64,
    pub volatility_band: VolatilityBand,
}

/// A review plus whether it was a fallback auto-approval.
#[derive(Debug, Clone)]
pub struct ReviewResult {
    pub review: ConsultantReview,
    pub auto_approved: bool,
}

/// Reviewing agent.
pub struct Consultant {
    transport: Arc<dyn LlmTransport>,
    model: String,
    timeout: Duration,
}

impl Consultant {
    #[must_use]
    pub fn new(transport: Arc<dyn LlmTransport>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            model: model.into(),
            timeout,
        }
    }

    /// Reviews a proposal. Infallible: every failure path yields an
    /// auto-approval, so trading never blocks on the reviewer.
    pub async fn review(&self, proposal: &Proposal, context: &MarketContext) -> ReviewResult {
        let reply = match self
            .transport
            .complete(
                &self.model,
                SYSTEM_PROMPT,
                &build_prompt(proposal, context),
                self.timeout,
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(symbol = %proposal.symbol, "consultant call failed: {e}");
                return ReviewResult {
                    review: ConsultantReview::auto_approve(&e.to_string()),
                    auto_approved: true,
                };
            }
        };

        match parse_review(reply) {
            Ok(review) => ReviewResult {
                review,
                auto_approved: false,
            },
            Err(detail) => {
                tracing::warn!(
                    symbol = %proposal.symbol,
                    "consultant reply unusable: {detail}"
                );
                ReviewResult {
                    review: ConsultantReview::auto_approve(&detail),
                    auto_approved: true,
                }
            }
        }
    }
}

/// Parses and coerces the consultant's reply.
///
/// # Errors
/// Returns a description of why the document was unusable.
pub fn parse_review(value: serde_json::Value) -> Result<ConsultantReview, String> {
    let mut review: ConsultantReview =
        serde_json::from_value(value).map_err(|e| e.to_string())?;

    review.confidence = review.confidence.clamp(0.0, 1.0);

    // A modify verdict with nothing to modify degrades to approval.
    if review.recommendation == Recommendation::Modify {
        let empty = review
            .modifications
            .as_ref()
            .map_or(true, |m| m.stop.is_none() && m.size.is_none());
        if empty {
            review.recommendation = Recommendation::Approve;
            review
                .concerns
                .push("modify verdict carried no modifications".to_string());
        }
    }

    Ok(review)
}

const SYSTEM_PROMPT: &str = "You are a senior trading consultant reviewing cryptocurrency \
trading proposals against risk-management principles. Respond with a single JSON object, no \
additional text:\n\
{\n\
  \"recommendation\": \"approve\" | \"reject\" | \"modify\",\n\
  \"concerns\": array of strings,\n\
  \"modifications\": { \"stop\": number, \"size\": number } or null,\n\
  \"confidence\": number in [0, 1],\n\
  \"reasoning\": string\n\
}\n\
APPROVE on strong alignment, REJECT on clear risk violations or poor \
timing, MODIFY for stop or size adjustments only. Size modifications may \
only reduce the position.";

fn build_prompt(proposal: &Proposal, context: &MarketContext) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Symbol: {}", proposal.symbol);
    let _ = writeln!(prompt, "Market regime: {}", context.regime);
    let _ = writeln!(
        prompt,
        "Sentiment: 24h {:.2}, trend {:.2}",
        context.sentiment_24h, context.sentiment_trend
    );
    let _ = writeln!(
        prompt,
        "Volatility band: {}",
        context.volatility_band.as_str()
    );

    let proposal_json =
        serde_json::to_string_pretty(proposal).unwrap_or_else(|_| "{}".to_string());
    let _ = writeln!(prompt, "\nProposal under review:\n{proposal_json}");

    prompt.push_str(
        "\nReview this proposal for risk/reward alignment, market conditions, sizing, and \
         stop placement. Respond as JSON.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use papertrade_core::{Side, TransportError};
    use serde_json::json;

    fn proposal() -> Proposal {
        Proposal::deterministic("BTC/USD", Side::Long, 2.0)
    }

    fn context() -> MarketContext {
        MarketContext {
            regime: Regime::Trend,
            sentiment_24h: 0.3,
            sentiment_trend: 0.1,
            volatility_band: VolatilityBand::Normal,
        }
    }

    struct FixedTransport(Result<serde_json::Value, ()>);

    #[async_trait]
    impl LlmTransport for FixedTransport {
        async fn complete(
            &self,
            _model: &str,
            _system_prompt: &str,
            _user_prompt: &str,
            timeout: Duration,
        ) -> Result<serde_json::Value, TransportError> {
            self.0.clone().map_err(|()| TransportError::Timeout(timeout))
        }
    }

    fn consultant(reply: Result<serde_json::Value, ()>) -> Consultant {
        Consultant::new(
            Arc::new(FixedTransport(reply)),
            "reviewer",
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_reject_review_passes_through() {
        let consultant = consultant(Ok(json!({
            "recommendation": "reject",
            "concerns": ["late entry"],
            "modifications": null,
            "confidence": 0.9,
            "reasoning": "Chasing an extended move."
        })));
        let result = consultant.review(&proposal(), &context()).await;
        assert!(!result.auto_approved);
        assert_eq!(result.review.recommendation, Recommendation::Reject);
        assert_eq!(result.review.concerns, vec!["late entry"]);
    }

    #[tokio::test]
    async fn test_timeout_auto_approves() {
        let consultant = consultant(Err(()));
        let result = consultant.review(&proposal(), &context()).await;
        assert!(result.auto_approved);
        assert_eq!(result.review.recommendation, Recommendation::Approve);
    }

    #[tokio::test]
    async fn test_unusable_reply_auto_approves() {
        let consultant = consultant(Ok(json!({ "verdict": "lgtm" })));
        let result = consultant.review(&proposal(), &context()).await;
        assert!(result.auto_approved);
    }

    #[test]
    fn test_parse_review_clamps_confidence() {
        let review = parse_review(json!({
            "recommendation": "approve",
            "confidence": 7.0,
            "reasoning": "fine"
        }))
        .unwrap();
        assert_eq!(review.confidence, 1.0);
    }

    #[test]
    fn test_empty_modify_degrades_to_approve() {
        let review = parse_review(json!({
            "recommendation": "modify",
            "modifications": null,
            "confidence": 0.6,
            "reasoning": "tweak"
        }))
        .unwrap();
        assert_eq!(review.recommendation, Recommendation::Approve);
        assert!(!review.concerns.is_empty());
    }

    #[test]
    fn test_volatility_bands() {
        assert_eq!(VolatilityBand::from_atr_pct(0.001), VolatilityBand::Low);
        assert_eq!(VolatilityBand::from_atr_pct(0.01), VolatilityBand::Normal);
        assert_eq!(VolatilityBand::from_atr_pct(0.02), VolatilityBand::High);
        assert_eq!(VolatilityBand::from_atr_pct(0.05), VolatilityBand::Extreme);
    }
}
