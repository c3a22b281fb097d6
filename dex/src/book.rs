//! Order book: arena of resting orders keyed by monotonic id

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DexError, Result};
use crate::order::{Order, OrderType};
use crate::{MIN_ORDER_AUTO, MIN_ORDER_ETH};

/// Result of matching `auto` tokens against a resting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    /// Owner of the resting order.
    pub owner: String,
    pub order_type: OrderType,
    /// AUTO matched by this fill.
    pub auto: u128,
    /// Currency settled for this fill, floor-proportional to `auto`.
    pub eth: u128,
    /// Whether the resting order was fully consumed and removed.
    pub closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    orders: BTreeMap<u64, Order>,
    next_id: u64,
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            orders: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Order minimums, checked before any escrow moves.
    pub fn validate_amounts(auto: u128, eth: u128) -> Result<()> {
        if auto < MIN_ORDER_AUTO {
            return Err(DexError::PaymentTooLow(
                "minimum AUTO requirement not met".to_string(),
            ));
        }
        if eth < MIN_ORDER_ETH {
            return Err(DexError::PaymentTooLow(
                "minimum ETH requirement not met".to_string(),
            ));
        }
        Ok(())
    }

    /// Register a new resting order and return its id. Ids start at 1 and
    /// are never reused.
    pub fn open(
        &mut self,
        owner: &str,
        order_type: OrderType,
        auto: u128,
        eth: u128,
    ) -> Result<u64> {
        Self::validate_amounts(auto, eth)?;

        let id = self.next_id;
        self.next_id += 1;
        self.orders.insert(
            id,
            Order {
                id,
                owner: owner.to_string(),
                order_type,
                auto,
                eth,
            },
        );
        log::info!(
            "order {} opened: {:?} {} AUTO / {} ETH by {}",
            id,
            order_type,
            auto,
            eth,
            owner
        );
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Result<&Order> {
        self.orders.get(&id).ok_or(DexError::OrderNotFound(id))
    }

    /// Number of currently open orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Currency owed for filling `auto` tokens of `order`. Full fills pay
    /// the exact remaining ETH so rounding can never strand escrow.
    pub fn proportional_eth(order: &Order, auto: u128) -> Result<u128> {
        if auto == 0 || auto > order.auto {
            return Err(DexError::AmountExceedsOrder {
                requested: auto,
                remaining: order.auto,
            });
        }
        if auto == order.auto {
            return Ok(order.eth);
        }
        auto.checked_mul(order.eth)
            .map(|x| x / order.auto)
            .ok_or(DexError::Overflow)
    }

    /// Match `auto` tokens against resting order `id`, reducing its
    /// remaining amounts and removing it once empty. The caller settles the
    /// returned amounts through the ledger.
    pub fn fill(&mut self, id: u64, auto: u128) -> Result<Fill> {
        let order = self.orders.get_mut(&id).ok_or(DexError::OrderNotFound(id))?;
        let eth = Self::proportional_eth(order, auto)?;

        order.auto -= auto;
        order.eth -= eth;
        let closed = order.auto == 0;
        let fill = Fill {
            owner: order.owner.clone(),
            order_type: order.order_type,
            auto,
            eth,
            closed,
        };
        if closed {
            self.orders.remove(&id);
        }
        log::info!(
            "order {} filled: {} AUTO / {} ETH{}",
            id,
            auto,
            eth,
            if closed { " (closed)" } else { "" }
        );
        Ok(fill)
    }

    /// Remove `id` and return it so the caller can refund the remaining
    /// escrow. Only the order owner may cancel.
    pub fn cancel(&mut self, id: u64, caller: &str) -> Result<Order> {
        let order = self.orders.get(&id).ok_or(DexError::OrderNotFound(id))?;
        if order.owner != caller {
            return Err(DexError::NotOrderOwner(id));
        }
        let order = self.orders.remove(&id).ok_or(DexError::OrderNotFound(id))?;
        log::info!(
            "order {} cancelled, refunding {} remaining",
            id,
            order.escrowed()
        );
        Ok(order)
    }

    /// Sum of remaining escrow across open orders of one side. The DEX
    /// reserve account must hold exactly this much of the matching asset.
    pub fn open_escrow(&self, order_type: OrderType) -> u128 {
        self.orders
            .values()
            .filter(|o| o.order_type == order_type)
            .map(Order::escrowed)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_assigns_monotonic_ids() {
        let mut book = OrderBook::new();
        let a = book
            .open("alice", OrderType::Sell, MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap();
        let b = book
            .open("bob", OrderType::Buy, MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(book.len(), 2);
        assert_eq!(book.get(1).unwrap().order_type, OrderType::Sell);
        assert_eq!(book.get(1).unwrap().order_type.code(), 2);
    }

    #[test]
    fn test_open_enforces_minimums() {
        let mut book = OrderBook::new();
        assert!(matches!(
            book.open("alice", OrderType::Sell, MIN_ORDER_AUTO - 1, MIN_ORDER_ETH),
            Err(DexError::PaymentTooLow(_))
        ));
        assert!(matches!(
            book.open("alice", OrderType::Sell, MIN_ORDER_AUTO, MIN_ORDER_ETH - 1),
            Err(DexError::PaymentTooLow(_))
        ));
    }

    #[test]
    fn test_full_fill_closes_order() {
        let mut book = OrderBook::new();
        let id = book
            .open("alice", OrderType::Sell, 10 * MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap();
        let fill = book.fill(id, 10 * MIN_ORDER_AUTO).unwrap();
        assert!(fill.closed);
        assert_eq!(fill.eth, MIN_ORDER_ETH, "Full fill pays exact remaining ETH");
        assert_eq!(book.len(), 0);
        assert_eq!(book.get(id), Err(DexError::OrderNotFound(id)));
    }

    #[test]
    fn test_partial_fill_is_proportional() {
        let mut book = OrderBook::new();
        let id = book
            .open("alice", OrderType::Sell, 4 * MIN_ORDER_AUTO, 4 * MIN_ORDER_ETH)
            .unwrap();
        let fill = book.fill(id, MIN_ORDER_AUTO).unwrap();
        assert!(!fill.closed);
        assert_eq!(fill.eth, MIN_ORDER_ETH);

        let rest = book.get(id).unwrap();
        assert_eq!(rest.auto, 3 * MIN_ORDER_AUTO);
        assert_eq!(rest.eth, 3 * MIN_ORDER_ETH);
        assert_eq!(book.open_escrow(OrderType::Sell), 3 * MIN_ORDER_AUTO);
    }

    #[test]
    fn test_partial_fill_rounding_never_strands_eth() {
        let mut book = OrderBook::new();
        // 3 AUTO for 100...0001 wei: the price does not divide evenly.
        let auto = 3 * MIN_ORDER_AUTO;
        let eth = MIN_ORDER_ETH + 1;
        let id = book.open("alice", OrderType::Sell, auto, eth).unwrap();

        let f1 = book.fill(id, MIN_ORDER_AUTO).unwrap();
        let f2 = book.fill(id, MIN_ORDER_AUTO).unwrap();
        let f3 = book.fill(id, MIN_ORDER_AUTO).unwrap();
        assert!(f3.closed);
        // The last fill absorbs the rounding remainder.
        assert_eq!(f1.eth + f2.eth + f3.eth, eth);
        assert_eq!(book.len(), 0);
    }

    #[test]
    fn test_overfill_rejected() {
        let mut book = OrderBook::new();
        let id = book
            .open("alice", OrderType::Sell, MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap();
        assert_eq!(
            book.fill(id, MIN_ORDER_AUTO + 1),
            Err(DexError::AmountExceedsOrder {
                requested: MIN_ORDER_AUTO + 1,
                remaining: MIN_ORDER_AUTO,
            })
        );
        assert!(matches!(
            book.fill(id, 0),
            Err(DexError::AmountExceedsOrder { .. })
        ));
        // Failed fills leave the order untouched.
        assert_eq!(book.get(id).unwrap().auto, MIN_ORDER_AUTO);
    }

    #[test]
    fn test_cancel_owner_only() {
        let mut book = OrderBook::new();
        let id = book
            .open("alice", OrderType::Buy, MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap();
        assert_eq!(book.cancel(id, "mallory"), Err(DexError::NotOrderOwner(id)));

        let order = book.cancel(id, "alice").unwrap();
        assert_eq!(order.escrowed(), MIN_ORDER_ETH, "Buy orders escrow ETH");
        assert_eq!(book.cancel(id, "alice"), Err(DexError::OrderNotFound(id)));
    }

    #[test]
    fn test_cancel_after_partial_fill_returns_remainder() {
        let mut book = OrderBook::new();
        let id = book
            .open("alice", OrderType::Sell, 4 * MIN_ORDER_AUTO, 4 * MIN_ORDER_ETH)
            .unwrap();
        book.fill(id, 3 * MIN_ORDER_AUTO).unwrap();

        let order = book.cancel(id, "alice").unwrap();
        assert_eq!(
            order.escrowed(),
            MIN_ORDER_AUTO,
            "Refund equals the unmatched remainder, not the original amount"
        );
    }

    #[test]
    fn test_book_serde_round_trip() {
        let mut book = OrderBook::new();
        book.open("alice", OrderType::Sell, MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap();
        let json = serde_json::to_string(&book).unwrap();
        let back: OrderBook = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.get(1).unwrap(), book.get(1).unwrap());
        // Ids continue after the round trip.
        let mut back = back;
        let id = back
            .open("bob", OrderType::Buy, MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap();
        assert_eq!(id, 2);
    }
}
