//! The advisor's strictly-typed proposal schema.

use papertrade_core::Side;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Proposal direction; `flat` means the advisor declines the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalSide {
    Long,
    Short,
    Flat,
}

impl ProposalSide {
    /// Maps to an executable side; `flat` has none.
    #[must_use]
    pub const fn to_side(self) -> Option<Side> {
        match self {
            Self::Long => Some(Side::Long),
            Self::Short => Some(Side::Short),
            Self::Flat => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySpec {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeProfitSpec {
    pub rr: f64,
}

/// Why a proposal document failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProposalError {
    #[error("proposal is not valid JSON for the schema: {0}")]
    Malformed(String),

    #[error("proposal field out of range: {field} ({detail})")]
    OutOfRange {
        field: &'static str,
        detail: String,
    },
}

/// The advisor's trade proposal. The advisor cannot invent prices, sizes,
/// or P&L: entries are market-only, stops are ATR-relative, and sizing
/// stays with the deterministic rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub symbol: String,
    pub side: ProposalSide,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub entry: EntrySpec,
    pub stop: StopSpec,
    pub take_profit: TakeProfitSpec,
    pub max_hold_bars: i64,
}

impl Proposal {
    /// Parses and validates a proposal document.
    ///
    /// # Errors
    /// Returns an error if the document does not match the schema or any
    /// field is out of range.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ProposalError> {
        let proposal: Self =
            serde_json::from_value(value).map_err(|e| ProposalError::Malformed(e.to_string()))?;
        proposal.validate()?;
        Ok(proposal)
    }

    /// Range checks over a structurally valid document.
    ///
    /// # Errors
    /// Returns the first out-of-range field.
    pub fn validate(&self) -> Result<(), ProposalError> {
        if self.symbol.is_empty() {
            return Err(ProposalError::OutOfRange {
                field: "symbol",
                detail: "empty".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ProposalError::OutOfRange {
                field: "confidence",
                detail: format!("{} not in [0, 1]", self.confidence),
            });
        }
        if self.entry.kind != "market" {
            return Err(ProposalError::OutOfRange {
                field: "entry.type",
                detail: format!("'{}' is not 'market'", self.entry.kind),
            });
        }
        if self.stop.kind != "atr" {
            return Err(ProposalError::OutOfRange {
                field: "stop.type",
                detail: format!("'{}' is not 'atr'", self.stop.kind),
            });
        }
        if !(self.stop.multiplier > 0.0) {
            return Err(ProposalError::OutOfRange {
                field: "stop.multiplier",
                detail: format!("{} not > 0", self.stop.multiplier),
            });
        }
        if !(self.take_profit.rr > 0.0) {
            return Err(ProposalError::OutOfRange {
                field: "take_profit.rr",
                detail: format!("{} not > 0", self.take_profit.rr),
            });
        }
        if self.max_hold_bars <= 0 {
            return Err(ProposalError::OutOfRange {
                field: "max_hold_bars",
                detail: format!("{} not > 0", self.max_hold_bars),
            });
        }
        Ok(())
    }

    /// The proposal used when the agents are disabled: executes the
    /// deterministic signal as-is.
    #[must_use]
    pub fn deterministic(symbol: &str, side: Side, atr_stop_multiplier: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: match side {
                Side::Long => ProposalSide::Long,
                Side::Short => ProposalSide::Short,
            },
            confidence: 0.5,
            reasons: vec!["deterministic signal (agents disabled)".to_string()],
            entry: EntrySpec {
                kind: "market".to_string(),
            },
            stop: StopSpec {
                kind: "atr".to_string(),
                multiplier: atr_stop_multiplier,
            },
            take_profit: TakeProfitSpec { rr: 2.0 },
            max_hold_bars: 40,
        }
    }
}
