//! Order representation

use serde::{Deserialize, Serialize};

/// Side of a resting order. Wire/getter encoding: Buy = 1, Sell = 2.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderType {
    Buy,
    Sell,
}

impl OrderType {
    pub fn code(self) -> u8 {
        match self {
            OrderType::Buy => 1,
            OrderType::Sell => 2,
        }
    }
}

/// A resting order. `auto` and `eth` always hold the *remaining* unmatched
/// amounts; the escrowed balance backing the order equals one of them,
/// depending on side (Sell escrows AUTO, Buy escrows ETH).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: u64,
    pub owner: String,
    pub order_type: OrderType,
    pub auto: u128,
    pub eth: u128,
}

impl Order {
    /// The escrowed remaining amount for this order's side.
    pub fn escrowed(&self) -> u128 {
        match self.order_type {
            OrderType::Buy => self.eth,
            OrderType::Sell => self.auto,
        }
    }
}
