//! Engine error types
//!
//! Every failing operation surfaces one of these and leaves the engine
//! untouched; there is no partial application.

use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Slot(#[from] slots::SlotError),

    #[error(transparent)]
    Dex(#[from] dex::DexError),

    #[error(transparent)]
    Governance(#[from] governance::GovernanceError),

    #[error(transparent)]
    Treasury(#[from] treasury::TreasuryError),

    #[error("Unauthorized: admin capability required")]
    Unauthorized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Accounting mismatch: {0}")]
    Accounting(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
