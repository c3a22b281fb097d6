//! Token and currency ledger
//!
//! One account record per address, holding an AUTO balance and an
//! internal currency (ETH) balance. `total_supply` and `held_currency`
//! are maintained alongside so conservation can be checked at any time:
//! the sum of token balances equals `total_supply`, and the sum of
//! currency balances equals the currency the contract holds externally.
//! Every mutation appends an audit event.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("Arithmetic overflow")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Deterministic address for a reserved account id (also used for
/// per-proposal escrow accounts, keyed by proposal id).
pub fn reserved_address(id: u64) -> String {
    format!("0x{:040x}", id)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub auto: u128,
    pub eth: u128,
}

/// Audit record for a single balance movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEvent {
    Transfer { from: String, to: String, amount: u128 },
    TransferEth { from: String, to: String, amount: u128 },
    Mint { to: String, amount: u128 },
    Burn { from: String, amount: u128 },
    Deposit { to: String, amount: u128 },
    Withdraw { from: String, amount: u128 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    accounts: HashMap<String, Account>,
    total_supply: u128,
    held_currency: u128,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, address: &str) -> u128 {
        self.accounts.get(address).map(|a| a.auto).unwrap_or(0)
    }

    pub fn eth_balance_of(&self, address: &str) -> u128 {
        self.accounts.get(address).map(|a| a.eth).unwrap_or(0)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Currency the contract holds externally on behalf of all internal
    /// balances.
    pub fn held_currency(&self) -> u128 {
        self.held_currency
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    fn account_mut(&mut self, address: &str) -> &mut Account {
        self.accounts.entry(address.to_string()).or_default()
    }

    fn record(&mut self, event: LedgerEvent) {
        log::debug!("ledger: {:?}", event);
        self.events.push(event);
    }

    /// Move `amount` AUTO between accounts. All-or-nothing: the check
    /// happens before either balance moves.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u128) -> Result<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            // Self-transfers and empty transfers are recorded but move
            // nothing.
            self.record(LedgerEvent::Transfer {
                from: from.to_string(),
                to: to.to_string(),
                amount,
            });
            return Ok(());
        }
        self.account_mut(from).auto -= amount;
        self.account_mut(to).auto += amount;
        self.record(LedgerEvent::Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        });
        Ok(())
    }

    /// Move `amount` of internal currency between accounts.
    pub fn transfer_eth(&mut self, from: &str, to: &str, amount: u128) -> Result<()> {
        let available = self.eth_balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            self.record(LedgerEvent::TransferEth {
                from: from.to_string(),
                to: to.to_string(),
                amount,
            });
            return Ok(());
        }
        self.account_mut(from).eth -= amount;
        self.account_mut(to).eth += amount;
        self.record(LedgerEvent::TransferEth {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        });
        Ok(())
    }

    /// Create `amount` new AUTO for `to`. Only genesis and slot-claim
    /// settlement mint.
    pub fn mint(&mut self, to: &str, amount: u128) -> Result<()> {
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.account_mut(to).auto += amount;
        self.record(LedgerEvent::Mint {
            to: to.to_string(),
            amount,
        });
        Ok(())
    }

    /// Destroy `amount` AUTO held by `from`.
    pub fn burn(&mut self, from: &str, amount: u128) -> Result<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.account_mut(from).auto -= amount;
        self.total_supply -= amount;
        self.record(LedgerEvent::Burn {
            from: from.to_string(),
            amount,
        });
        Ok(())
    }

    /// Currency arriving with a call: the contract now holds it and `to`
    /// may spend it internally.
    pub fn deposit(&mut self, to: &str, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.held_currency = self
            .held_currency
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.account_mut(to).eth += amount;
        self.record(LedgerEvent::Deposit {
            to: to.to_string(),
            amount,
        });
        Ok(())
    }

    /// Pay out `amount` of `from`'s internal currency externally.
    pub fn withdraw(&mut self, from: &str, amount: u128) -> Result<()> {
        let available = self.eth_balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        self.account_mut(from).eth -= amount;
        self.held_currency -= amount;
        self.record(LedgerEvent::Withdraw {
            from: from.to_string(),
            amount,
        });
        Ok(())
    }

    /// Check conservation: token balances sum to the supply and currency
    /// balances sum to the externally held currency.
    pub fn is_balanced(&self) -> bool {
        let mut auto_sum: u128 = 0;
        let mut eth_sum: u128 = 0;
        for account in self.accounts.values() {
            auto_sum += account.auto;
            eth_sum += account.eth;
        }
        auto_sum == self.total_supply && eth_sum == self.held_currency
    }
}
