//! Proposal and treasury budget management
//!
//! Tracks each proposal's lifecycle (Started → Accepted/Rejected →
//! Contested → Completed), the per-period budget it escrowed from the
//! treasury, and the claim/sweep arithmetic that guarantees no unit is
//! ever stranded in escrow or paid twice.

pub mod error;
pub mod proposal;

pub use error::{Result, TreasuryError};
pub use proposal::{
    check_budget_cap, ClaimOutcome, Proposal, ProposalParams, ProposalRegistry, ProposalState,
    Transition,
};

/// Treasury configuration constants
pub mod config {
    /// Seconds between ballot activation and the initial approval decision.
    pub const PROPOSAL_START_PERIOD: u64 = 90;

    /// Seconds a contested proposal stays open before resolution.
    pub const CONTEST_PERIOD: u64 = 90;

    /// First id handed to a proposal. Lower ids address reserved ledger
    /// accounts (null, treasury, DEX reserve), and each proposal's escrow
    /// account is derived from its id, so the ranges must not overlap.
    pub const FIRST_PROPOSAL_ID: u64 = 3;
}
