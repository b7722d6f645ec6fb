//! Deterministic signal rules: regime classification, entry and exit
//! predicates, position sizing, and the kill-switch volatility measure.

pub mod entry;
pub mod exit;
pub mod regime;
pub mod sizing;
pub mod volatility;

pub use entry::{check_entry, EntrySignal};
pub use exit::{evaluate_exit, ExitDecision, OpenPositionView};
pub use regime::classify_regime;
pub use sizing::position_size;
pub use volatility::{realized_vol, rolling_realized_vol, KillSwitchCheck};
