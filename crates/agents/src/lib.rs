//! The two LLM agents and their deterministic surroundings.
//!
//! The advisor turns a fired signal plus market context into a
//! strictly-typed proposal; the consultant reviews it; reconciliation maps
//! the review onto an exhaustively-checked outcome the validator and
//! broker consume. All model I/O goes through the `LlmTransport` trait so
//! the agents are testable without a network.

pub mod advisor;
pub mod consultant;
pub mod proposal;
pub mod rationale;
pub mod reconcile;
pub mod transport;

pub use advisor::{Advisor, AdvisorContext, AdvisorError, PositionSummary};
pub use consultant::{
    Consultant, ConsultantReview, MarketContext, Modifications, Recommendation, ReviewResult,
    VolatilityBand,
};
pub use proposal::{Proposal, ProposalError, ProposalSide};
pub use rationale::{DecisionRationale, FinalDecision};
pub use reconcile::{reconcile, ReviewOutcome};
pub use transport::OpenRouterTransport;
