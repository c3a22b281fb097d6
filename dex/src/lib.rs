//! Spot exchange between the AUTO token and the native currency
//!
//! Maintains the resting order book and the proportional fill math. The
//! book tracks remaining amounts only; escrow and settlement run against
//! the ledger one layer up, so every mutation here has an exactly matching
//! balance movement there.

pub mod book;
pub mod error;
pub mod order;

pub use book::{Fill, OrderBook};
pub use error::{DexError, Result};
pub use order::{Order, OrderType};

/// AUTO token unit (8 decimal places).
pub const AUTO_UNIT: u128 = 100_000_000;

/// Smallest AUTO amount an order may carry.
pub const MIN_ORDER_AUTO: u128 = AUTO_UNIT;

/// Smallest currency amount an order may carry.
pub const MIN_ORDER_ETH: u128 = 1_000_000;
