//! The decision-rationale blob stored on every trade.
//!
//! Typed internally, serialized to a schema-less JSON value at persist
//! time. Audit-only: nothing reads it back for control flow.

use crate::consultant::ConsultantReview;
use crate::proposal::Proposal;
use papertrade_core::{Regime, SentimentSnapshot};
use papertrade_indicators::FeatureSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What finally happened to the proposal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinalDecision {
    Executed,
    ExecutedModified {
        stop: Option<Decimal>,
        qty: Option<Decimal>,
    },
    Rejected {
        reason: String,
    },
}

/// The full audit record captured at the moment of decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRationale {
    pub decision_id: Uuid,
    pub regime: Regime,
    pub indicators: FeatureSnapshot,
    pub sentiment: Option<SentimentSnapshot>,
    pub proposal: Proposal,
    pub review: Option<ConsultantReview>,
    pub decision: FinalDecision,
}

impl DecisionRationale {
    /// Serializes for the trade row's JSONB column.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrade_core::Side;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rationale_roundtrip() {
        let rationale = DecisionRationale {
            decision_id: Uuid::new_v4(),
            regime: Regime::Trend,
            indicators: FeatureSnapshot::default(),
            sentiment: None,
            proposal: Proposal::deterministic("BTC/USD", Side::Long, 2.0),
            review: None,
            decision: FinalDecision::ExecutedModified {
                stop: Some(dec!(98.5)),
                qty: Some(dec!(5)),
            },
        };

        let value = rationale.to_json();
        assert_eq!(value["regime"], "trend");
        assert_eq!(value["decision"]["outcome"], "executed_modified");

        let back: DecisionRationale = serde_json::from_value(value).unwrap();
        assert_eq!(back.decision, rationale.decision);
        assert_eq!(back.decision_id, rationale.decision_id);
    }
}
