//! The paper broker: modeled fills with slippage and fees, and the
//! crash-safe trade lifecycle over the persistence boundary.
//!
//! Zero external calls by construction; fills are simulated locally and
//! every fill's writes (trade row plus position row) succeed or fail as
//! one transaction.

pub mod broker;
pub mod fill;

pub use broker::{CloseReport, FillReport, OpenRequest, PaperBroker, BrokerError};
pub use fill::{entry_fill, exit_fill, fee, realized_pnl, slippage_bps};
