//! Exchange error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DexError {
    #[error("Payment too low: {0}")]
    PaymentTooLow(String),

    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    #[error("Not the order owner: order {0}")]
    NotOrderOwner(u64),

    #[error("Amount exceeds order: requested {requested}, remaining {remaining}")]
    AmountExceedsOrder { requested: u128, remaining: u128 },

    #[error("Order {0} is on the wrong side for this operation")]
    WrongOrderType(u64),

    #[error("Arithmetic overflow")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, DexError>;
