//! Ballot box voting machinery
//!
//! One ballot box per proposal, paired by id. A ballot starts out
//! collecting gas prepayments, becomes active once every eligible slot is
//! paid for, accepts per-slot votes while active, and is deactivated
//! exactly once when its proposal reaches a terminal state.

pub mod ballot;
pub mod error;

pub use ballot::{BallotBox, BallotRegistry, BallotState, VoteChoice};
pub use error::{GovernanceError, Result};

/// Governance configuration constants
pub mod config {
    /// Currency charged per slot to cover vote processing.
    pub const VOTE_GAS_FEE: u128 = 10_000;
}
