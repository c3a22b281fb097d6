//! Slot automaton error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Invalid slot index: {index} (have {num_slots} slots)")]
    InvalidSlot { index: u32, num_slots: u32 },

    #[error("Insufficient work: claim key does not meet the required difficulty")]
    InsufficientWork,
}

pub type Result<T> = std::result::Result<T, SlotError>;
