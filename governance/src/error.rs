//! Governance error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Invalid ballot box ID: {0}")]
    InvalidBallotId(u64),

    #[error("Ballot is not active: {0}")]
    BallotNotActive(u64),

    #[error("Invalid slot owner for slot {slot}")]
    InvalidSlotOwner { slot: u32 },

    #[error("Too many slots: requested {requested}, {remaining} still unpaid")]
    TooManySlots { requested: u32, remaining: u32 },

    #[error("Invalid slot index: {0}")]
    InvalidSlot(u32),

    #[error("Invalid vote choice")]
    InvalidVote,

    #[error("Payment too low: {0}")]
    PaymentTooLow(String),
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
