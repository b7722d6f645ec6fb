//! The risk validator: last gate before the broker.
//!
//! Rejections are expected control flow, not errors. Each carries a
//! machine-readable reason code that lands in the event log.

use papertrade_core::{Regime, Side};
use rust_decimal::Decimal;

/// Absolute tolerance on cap comparisons, covering 8-dp quantity rounding.
const CAP_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

/// Why a proposal was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Entry direction is not allowed in the current regime.
    RegimeMismatch,
    /// An open position already exists for the symbol.
    PositionExists,
    /// Notional would exceed the per-symbol exposure cap.
    ExposureCap,
    /// Entry-to-stop risk would exceed the per-trade risk cap.
    RiskCap,
    /// The symbol's kill-switch block is active.
    KillSwitchActive,
    /// Within the post-stop-out cooldown window.
    CooldownActive,
    /// Sizing rounded to zero.
    QtyZero,
    /// The proposal failed schema validation.
    SchemaInvalid,
    /// Operator pause after an invariant violation.
    SymbolPaused,
}

impl RejectReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RegimeMismatch => "REGIME_MISMATCH",
            Self::PositionExists => "POSITION_EXISTS",
            Self::ExposureCap => "EXPOSURE_CAP",
            Self::RiskCap => "RISK_CAP",
            Self::KillSwitchActive => "KILL_SWITCH_ACTIVE",
            Self::CooldownActive => "COOLDOWN_ACTIVE",
            Self::QtyZero => "QTY_ZERO",
            Self::SchemaInvalid => "SCHEMA_INVALID",
            Self::SymbolPaused => "SYMBOL_PAUSED",
        }
    }
}

/// Everything the validator sees for one candidate entry.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub regime: Regime,
    pub side: Side,
    pub qty: Decimal,
    pub entry: Decimal,
    pub stop: Decimal,
    pub nav: Decimal,
    pub max_exposure_per_symbol: Decimal,
    pub risk_per_trade: Decimal,
    pub position_exists: bool,
    pub kill_switch_active: bool,
    pub cooldown_active: bool,
    pub paused: bool,
    pub schema_valid: bool,
}

/// Runs every check; the first failing one wins.
///
/// # Errors
/// Returns the reject reason; the caller logs it and moves on.
pub fn validate(ctx: &ValidationContext) -> Result<(), RejectReason> {
    if !ctx.schema_valid {
        return Err(RejectReason::SchemaInvalid);
    }
    if ctx.paused {
        return Err(RejectReason::SymbolPaused);
    }
    if ctx.kill_switch_active {
        return Err(RejectReason::KillSwitchActive);
    }
    if ctx.cooldown_active {
        return Err(RejectReason::CooldownActive);
    }
    if ctx.regime != Regime::Trend {
        return Err(RejectReason::RegimeMismatch);
    }
    if ctx.position_exists {
        return Err(RejectReason::PositionExists);
    }
    if ctx.qty <= Decimal::ZERO {
        return Err(RejectReason::QtyZero);
    }
    if ctx.qty * ctx.entry > ctx.max_exposure_per_symbol * ctx.nav + CAP_TOLERANCE {
        return Err(RejectReason::ExposureCap);
    }
    if ctx.qty * (ctx.entry - ctx.stop).abs() > ctx.risk_per_trade * ctx.nav + CAP_TOLERANCE {
        return Err(RejectReason::RiskCap);
    }
    Ok(())
}
