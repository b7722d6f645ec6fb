//! Deterministic reconciliation of the consultant's review.
//!
//! The review is mapped onto a closed outcome type so every downstream
//! path (validator, broker, rationale) is exhaustively checked. Stop
//! modifications must stay inside the ATR band; size modifications may
//! only reduce quantity. A modification outside its bound downgrades the
//! whole review to a reject, with the violation recorded as a concern.

use crate::consultant::{ConsultantReview, Recommendation};
use papertrade_core::Side;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Final word on a proposal after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    /// Execute the proposal unchanged.
    Approve,
    /// Do not execute.
    Reject { concerns: Vec<String> },
    /// Execute with the given replacements applied.
    Modify {
        stop: Option<Decimal>,
        qty: Option<Decimal>,
        concerns: Vec<String>,
    },
}

/// Stop band half-widths in ATR multiples: the modified stop must keep
/// between 0.5 and 3 ATRs of room from the entry.
const STOP_BAND_MIN_ATR: f64 = 0.5;
const STOP_BAND_MAX_ATR: f64 = 3.0;

/// Applies the reconciliation rules to a review of a proposal whose entry
/// reference, ATR, and deterministic quantity are known.
#[must_use]
pub fn reconcile(
    review: &ConsultantReview,
    side: Side,
    entry: f64,
    atr: f64,
    qty: Decimal,
) -> ReviewOutcome {
    match review.recommendation {
        Recommendation::Approve => ReviewOutcome::Approve,
        Recommendation::Reject => ReviewOutcome::Reject {
            concerns: review.concerns.clone(),
        },
        Recommendation::Modify => {
            let Some(modifications) = &review.modifications else {
                return ReviewOutcome::Approve;
            };
            let mut concerns = review.concerns.clone();

            let stop = match modifications.stop {
                None => None,
                Some(new_stop) => {
                    if stop_within_band(side, entry, atr, new_stop) {
                        match Decimal::from_f64(new_stop) {
                            Some(stop) => Some(stop),
                            None => {
                                concerns.push(format!("unrepresentable stop {new_stop}"));
                                return ReviewOutcome::Reject { concerns };
                            }
                        }
                    } else {
                        concerns.push(format!(
                            "stop {new_stop} outside the {STOP_BAND_MIN_ATR}-{STOP_BAND_MAX_ATR} ATR band"
                        ));
                        return ReviewOutcome::Reject { concerns };
                    }
                }
            };

            let new_qty = match modifications.size {
                None => None,
                Some(size) => match Decimal::from_f64(size) {
                    Some(size) if size > Decimal::ZERO && size < qty => Some(size),
                    _ => {
                        concerns.push(format!(
                            "size modification {} may only reduce quantity below {qty}",
                            modifications.size.unwrap_or_default()
                        ));
                        return ReviewOutcome::Reject { concerns };
                    }
                },
            };

            if stop.is_none() && new_qty.is_none() {
                return ReviewOutcome::Approve;
            }
            ReviewOutcome::Modify {
                stop,
                qty: new_qty,
                concerns,
            }
        }
    }
}

/// For a long, the stop must sit in `[entry - 3*ATR, entry - 0.5*ATR]`;
/// mirrored above the entry for a short.
fn stop_within_band(side: Side, entry: f64, atr: f64, stop: f64) -> bool {
    if atr.is_nan() || atr <= 0.0 {
        return false;
    }
    match side {
        Side::Long => {
            stop >= entry - STOP_BAND_MAX_ATR * atr && stop <= entry - STOP_BAND_MIN_ATR * atr
        }
        Side::Short => {
            stop >= entry + STOP_BAND_MIN_ATR * atr && stop <= entry + STOP_BAND_MAX_ATR * atr
        }
    }
}
