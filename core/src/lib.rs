//! King-of-the-Hill engine core
//!
//! Owns the token/currency ledger and the `Automaton` facade that wires
//! the slot contest, the exchange and the proposal subsystem together.
//! Every balance movement in the system happens through this crate, so
//! the conservation invariants are checked here and nowhere else.

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod snapshot;

pub use config::Config;
pub use engine::Automaton;
pub use error::{EngineError, Result};
pub use ledger::{Ledger, LedgerError, LedgerEvent};

/// Core constants
pub mod constants {
    /// AUTO token unit (8 decimal places).
    pub const AUTO_UNIT: u128 = 100_000_000;

    /// Days of emission pre-minted to the treasury at genesis.
    pub const GENESIS_SUPPLY_DAYS: u64 = 365;

    /// Reserved ledger account ids.
    pub const NULL_ACCOUNT: u64 = 0;
    pub const TREASURY_ACCOUNT: u64 = 1;
    pub const DEX_ACCOUNT: u64 = 2;
}
