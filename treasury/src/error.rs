//! Treasury error types

use thiserror::Error;

use crate::proposal::ProposalState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    #[error("Proposal not found: {0}")]
    ProposalNotFound(u64),

    #[error("Wrong proposal state: {state:?}")]
    WrongProposalState { state: ProposalState },

    #[error("Budget exceeded: requested {requested} per period, claimable cap {cap}")]
    BudgetExceeded { requested: u128, cap: u128 },

    #[error("Budget exceeds treasury cap: requested {requested}, cap {cap}")]
    BudgetExceedsCap { requested: u128, cap: u128 },

    #[error("Invalid budget period length")]
    InvalidPeriodLength,

    #[error("Arithmetic overflow")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, TreasuryError>;
