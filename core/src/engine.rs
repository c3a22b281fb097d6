//! The on-chain automaton
//!
//! `Automaton` is the single serialized state machine behind the public
//! operation surface: ledger transfers, slot claims, exchange orders and
//! the proposal/ballot/treasury subsystem. Calls execute to completion
//! one at a time; every operation validates all of its preconditions
//! before the first balance moves, so a returned error means nothing
//! changed.
//!
//! Time never comes from an ambient clock. Operations that depend on it
//! take an explicit `now` timestamp, which keeps every transition
//! replayable.

use serde::{Deserialize, Serialize};

use dex::{Order, OrderBook, OrderType};
use governance::{BallotBox, BallotRegistry, GovernanceError, VoteChoice};
use slots::SlotRegistry;
use treasury::config::{CONTEST_PERIOD, PROPOSAL_START_PERIOD};
use treasury::{Proposal, ProposalParams, ProposalRegistry, ProposalState, Transition, TreasuryError};

use crate::config::Config;
use crate::constants::{DEX_ACCOUNT, GENESIS_SUPPLY_DAYS, TREASURY_ACCOUNT};
use crate::error::{EngineError, Result};
use crate::ledger::{reserved_address, Ledger, LedgerError, LedgerEvent};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Automaton {
    config: Config,
    ledger: Ledger,
    slots: SlotRegistry,
    book: OrderBook,
    ballots: BallotRegistry,
    proposals: ProposalRegistry,
    treasury: String,
    dex: String,
}

impl Automaton {
    /// Construct the engine. Genesis mints one year of emission to the
    /// treasury so the budget subsystem is funded from the start.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let mask = config.mask_bytes()?;
        let treasury = reserved_address(TREASURY_ACCOUNT);
        let dex = reserved_address(DEX_ACCOUNT);

        let mut ledger = Ledger::new();
        let genesis = config
            .initial_daily_supply
            .checked_mul(GENESIS_SUPPLY_DAYS as u128)
            .ok_or(LedgerError::Overflow)?;
        ledger.mint(&treasury, genesis)?;

        Ok(Self {
            slots: SlotRegistry::new(config.num_slots, config.difficulty_bits, mask),
            book: OrderBook::new(),
            ballots: BallotRegistry::new(),
            proposals: ProposalRegistry::new(),
            ledger,
            treasury,
            dex,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn treasury_address(&self) -> &str {
        &self.treasury
    }

    pub fn dex_address(&self) -> &str {
        &self.dex
    }

    /// Escrow account paired with a proposal id.
    pub fn escrow_address(id: u64) -> String {
        reserved_address(id)
    }

    // ---- Ledger operations ----

    pub fn transfer(&mut self, caller: &str, to: &str, amount: u128) -> Result<()> {
        self.ledger.transfer(caller, to, amount)?;
        Ok(())
    }

    pub fn balance_of(&self, account: &str) -> u128 {
        self.ledger.balance_of(account)
    }

    /// Internal currency balance, withdrawable via `withdraw`.
    pub fn balance_eth(&self, account: &str) -> u128 {
        self.ledger.eth_balance_of(account)
    }

    /// Pay out `amount` of the caller's internal currency externally and
    /// return the amount released.
    pub fn withdraw(&mut self, caller: &str, amount: u128) -> Result<u128> {
        self.ledger.withdraw(caller, amount)?;
        Ok(amount)
    }

    pub fn total_supply(&self) -> u128 {
        self.ledger.total_supply()
    }

    pub fn held_currency(&self) -> u128 {
        self.ledger.held_currency()
    }

    pub fn events(&self) -> &[LedgerEvent] {
        self.ledger.events()
    }

    // ---- Slot operations ----

    /// Claim a slot with a proof of work. The evicted owner, if any, is
    /// settled their accrued emission at this boundary.
    pub fn claim_slot(&mut self, caller: &str, slot: u32, proof: &[u8], now: u64) -> Result<()> {
        // Mint headroom is verified before the claim commits so the
        // settlement below cannot fail.
        let current = self.slots.slot(slot)?;
        if current.owner.is_some() {
            let held = now.saturating_sub(current.claimed_at);
            let accrued = slots::accrued_emission(
                self.config.initial_daily_supply,
                held,
                self.config.num_slots,
            );
            self.ledger
                .total_supply()
                .checked_add(accrued)
                .ok_or(LedgerError::Overflow)?;
        }

        let outcome = self.slots.claim(slot, caller, proof, now)?;
        if let Some((evicted, held)) = outcome.evicted {
            let accrued = slots::accrued_emission(
                self.config.initial_daily_supply,
                held,
                self.config.num_slots,
            );
            if accrued > 0 {
                self.ledger.mint(&evicted, accrued)?;
            }
        }
        Ok(())
    }

    /// Bootstrap/test override handing every slot to the caller. Admin
    /// only.
    pub fn set_owner_all_slots(&mut self, caller: &str, now: u64) -> Result<()> {
        if caller != self.config.admin {
            return Err(EngineError::Unauthorized);
        }
        self.slots.set_owner_all(caller, now);
        Ok(())
    }

    pub fn slot_owner(&self, slot: u32) -> Result<Option<String>> {
        Ok(self.slots.owner_of(slot)?.map(str::to_string))
    }

    pub fn num_slots(&self) -> u32 {
        self.config.num_slots
    }

    // ---- Exchange operations ----

    pub fn min_order_auto(&self) -> u128 {
        dex::MIN_ORDER_AUTO
    }

    pub fn min_order_eth(&self) -> u128 {
        dex::MIN_ORDER_ETH
    }

    /// Place a sell order, escrowing `auto` tokens in the DEX reserve.
    pub fn sell(&mut self, caller: &str, auto: u128, eth: u128) -> Result<u64> {
        OrderBook::validate_amounts(auto, eth)?;
        self.ledger.transfer(caller, &self.dex.clone(), auto)?;
        let id = self.book.open(caller, OrderType::Sell, auto, eth)?;
        Ok(id)
    }

    /// Place a buy order. `payment` is the currency attached to the call;
    /// `eth` of it is escrowed and any excess stays withdrawable by the
    /// caller.
    pub fn buy(&mut self, caller: &str, auto: u128, eth: u128, payment: u128) -> Result<u64> {
        OrderBook::validate_amounts(auto, eth)?;
        if payment < eth {
            return Err(dex::DexError::PaymentTooLow(
                "minimum ETH requirement not met".to_string(),
            )
            .into());
        }
        self.ledger.deposit(caller, payment)?;
        self.ledger.transfer_eth(caller, &self.dex.clone(), eth)?;
        let id = self.book.open(caller, OrderType::Buy, auto, eth)?;
        Ok(id)
    }

    /// Take `auto` tokens from resting sell order `order_id` at its
    /// price, paying with the attached currency.
    pub fn buy_now(&mut self, caller: &str, order_id: u64, auto: u128, payment: u128) -> Result<()> {
        let order = self.book.get(order_id)?;
        if order.order_type != OrderType::Sell {
            return Err(dex::DexError::WrongOrderType(order_id).into());
        }
        let eth_due = OrderBook::proportional_eth(order, auto)?;
        if payment < eth_due {
            return Err(dex::DexError::PaymentTooLow(
                "attached ETH below the order price".to_string(),
            )
            .into());
        }

        self.ledger.deposit(caller, payment)?;
        let fill = self.book.fill(order_id, auto)?;
        self.ledger.transfer_eth(caller, &fill.owner, fill.eth)?;
        self.ledger.transfer(&self.dex.clone(), caller, fill.auto)?;
        Ok(())
    }

    /// Sell `auto` tokens into resting buy order `order_id`. `eth` is the
    /// taker's minimum acceptable proceeds; settlement pays the order's
    /// proportional value.
    pub fn sell_now(&mut self, caller: &str, order_id: u64, auto: u128, eth: u128) -> Result<()> {
        let order = self.book.get(order_id)?;
        if order.order_type != OrderType::Buy {
            return Err(dex::DexError::WrongOrderType(order_id).into());
        }
        let proceeds = OrderBook::proportional_eth(order, auto)?;
        if proceeds < eth {
            return Err(dex::DexError::PaymentTooLow(
                "order proceeds below the requested ETH".to_string(),
            )
            .into());
        }
        let owner = order.owner.clone();

        self.ledger.transfer(caller, &owner, auto)?;
        let fill = self.book.fill(order_id, auto)?;
        self.ledger.transfer_eth(&self.dex.clone(), caller, fill.eth)?;
        Ok(())
    }

    /// Cancel a resting order, refunding exactly the unmatched remainder
    /// to the owner's withdrawable balances.
    pub fn cancel_order(&mut self, caller: &str, order_id: u64) -> Result<()> {
        let order = self.book.cancel(order_id, caller)?;
        match order.order_type {
            OrderType::Sell => self.ledger.transfer(&self.dex.clone(), caller, order.auto)?,
            OrderType::Buy => self
                .ledger
                .transfer_eth(&self.dex.clone(), caller, order.eth)?,
        }
        Ok(())
    }

    pub fn get_order(&self, order_id: u64) -> Result<&Order> {
        Ok(self.book.get(order_id)?)
    }

    /// Number of currently open orders.
    pub fn get_orders_length(&self) -> usize {
        self.book.len()
    }

    // ---- Proposal and ballot operations ----

    /// Create a proposal, escrowing its full requested budget from the
    /// treasury and opening its ballot box. `payment` must cover one
    /// slot's vote gas, which is prepaid on behalf of the creator.
    pub fn create_proposal(
        &mut self,
        caller: &str,
        params: ProposalParams,
        payment: u128,
        now: u64,
    ) -> Result<u64> {
        let requested = params
            .budget_per_period
            .checked_mul(params.num_periods as u128)
            .ok_or(TreasuryError::Overflow)?;
        treasury::check_budget_cap(
            requested,
            self.ledger.balance_of(&self.treasury),
            self.config.treasury_limit_percentage,
        )?;
        let gas_due = if self.config.num_slots > 0 {
            governance::config::VOTE_GAS_FEE
        } else {
            0
        };
        if payment < gas_due {
            return Err(GovernanceError::PaymentTooLow(format!(
                "proposal creation requires {} vote gas",
                gas_due
            ))
            .into());
        }
        self.deposit_headroom(payment)?;

        let id = self.proposals.create(params, now)?;
        let escrow = Self::escrow_address(id);
        self.ledger.transfer(&self.treasury.clone(), &escrow, requested)?;
        self.ledger.deposit(caller, payment)?;

        let ballot = self.ballots.create(id, self.config.num_slots, now);
        if gas_due > 0 {
            ballot.pay_for_gas(1, now)?;
            self.ledger.transfer_eth(caller, &escrow, gas_due)?;
        }
        log::info!("proposal {} created by {} (budget {})", id, caller, requested);
        Ok(id)
    }

    /// Prepay vote gas for `slots_to_pay` more slots of ballot `id`.
    pub fn pay_for_gas(
        &mut self,
        caller: &str,
        id: u64,
        slots_to_pay: u32,
        payment: u128,
        now: u64,
    ) -> Result<()> {
        let required = governance::config::VOTE_GAS_FEE
            .checked_mul(slots_to_pay as u128)
            .ok_or(LedgerError::Overflow)?;
        if payment < required {
            return Err(GovernanceError::PaymentTooLow(format!(
                "{} slots require {} vote gas",
                slots_to_pay, required
            ))
            .into());
        }
        self.deposit_headroom(payment)?;

        let ballot = self.ballots.get_mut(id)?;
        ballot.pay_for_gas(slots_to_pay, now)?;
        self.ledger.deposit(caller, payment)?;
        self.ledger
            .transfer_eth(caller, &Self::escrow_address(id), required)?;
        Ok(())
    }

    pub fn unpaid_slots(&self, id: u64) -> Result<u32> {
        Ok(self.ballots.get(id)?.unpaid_slots())
    }

    /// Cast (or change) the vote of `slot` on ballot `id`. Ownership is
    /// checked live against the slot registry at call time.
    pub fn cast_vote(&mut self, caller: &str, id: u64, slot: u32, choice: VoteChoice) -> Result<()> {
        let ballot = self.ballots.get(id)?;
        if !ballot.is_active() {
            return Err(GovernanceError::BallotNotActive(id).into());
        }
        if !self.slots.is_owner(slot, caller) {
            return Err(GovernanceError::InvalidSlotOwner { slot }.into());
        }
        self.ballots.get_mut(id)?.cast_vote(slot, choice)?;
        Ok(())
    }

    pub fn get_vote(&self, id: u64, slot: u32) -> Result<VoteChoice> {
        Ok(self.ballots.get(id)?.vote_of(slot)?)
    }

    pub fn get_vote_count(&self, id: u64, choice: VoteChoice) -> Result<u32> {
        Ok(self.ballots.get(id)?.vote_count(choice))
    }

    /// Bulk test helper: vote Yes with every slot the caller owns.
    pub fn cast_votes_for_approval(&mut self, caller: &str, id: u64) -> Result<u32> {
        self.cast_votes_for(caller, id, VoteChoice::Yes)
    }

    /// Bulk test helper: vote No with every slot the caller owns.
    pub fn cast_votes_for_rejection(&mut self, caller: &str, id: u64) -> Result<u32> {
        self.cast_votes_for(caller, id, VoteChoice::No)
    }

    fn cast_votes_for(&mut self, caller: &str, id: u64, choice: VoteChoice) -> Result<u32> {
        let ballot = self.ballots.get(id)?;
        if !ballot.is_active() {
            return Err(GovernanceError::BallotNotActive(id).into());
        }
        let mut cast = 0;
        for slot in 0..self.config.num_slots {
            if self.slots.is_owner(slot, caller) {
                self.ballots.get_mut(id)?.cast_vote(slot, choice)?;
                cast += 1;
            }
        }
        Ok(cast)
    }

    pub fn calc_vote_difference(&self, id: u64) -> Result<i64> {
        Ok(self.ballots.get(id)?.vote_difference())
    }

    /// Permissionless tick advancing proposal `id` (and its ballot) from
    /// stored timestamps and the current tallies. Safe to call any number
    /// of times from any account.
    pub fn update_proposal_state(&mut self, id: u64, now: u64) -> Result<()> {
        let approval = self.config.approval_percentage;
        let contest = self.config.contest_percentage;

        let ballot = self.ballots.get(id).map_err(|_| TreasuryError::ProposalNotFound(id))?;
        let activation = if ballot.is_active() {
            Some(ballot.activation_time)
        } else {
            None
        };
        let vote_difference = ballot.vote_difference();

        let proposal = self.proposals.get_mut(id)?;
        let transition = proposal.update_state(
            now,
            activation,
            vote_difference,
            approval,
            contest,
            PROPOSAL_START_PERIOD,
            CONTEST_PERIOD,
        );

        if transition == Transition::Rejected {
            self.sweep_escrow(id)?;
            self.ballots.get_mut(id)?.deactivate();
        }
        Ok(())
    }

    /// Claim up to `amount` per eligible period for proposal `id`. Any
    /// account may trigger the claim; the payout goes to the proposal's
    /// designated recipient and the per-period remainder to the treasury.
    pub fn claim_reward(&mut self, id: u64, amount: u128, now: u64) -> Result<()> {
        let escrow = Self::escrow_address(id);
        let proposal = self.proposals.get_mut(id)?;
        if proposal.state != ProposalState::Accepted {
            return Err(TreasuryError::WrongProposalState {
                state: proposal.state,
            }
            .into());
        }
        let recipient = proposal.recipient.clone();

        // The escrow must cover everything the claim will move; verified
        // before the claim clock advances.
        let eligible = proposal.eligible_periods(now);
        let needed = proposal
            .budget_per_period
            .checked_mul(eligible as u128)
            .ok_or(TreasuryError::Overflow)?;
        if self.ledger.balance_of(&escrow) < needed {
            return Err(EngineError::Accounting(format!(
                "escrow for proposal {} holds less than its remaining budget",
                id
            )));
        }

        let outcome = proposal.claim(amount, now)?;
        self.ledger.transfer(&escrow, &recipient, outcome.to_recipient)?;
        self.ledger
            .transfer(&escrow, &self.treasury.clone(), outcome.to_treasury)?;

        if outcome.completed {
            self.sweep_escrow(id)?;
            self.ballots.get_mut(id)?.deactivate();
        }
        Ok(())
    }

    pub fn get_proposal(&self, id: u64) -> Result<&Proposal> {
        Ok(self.proposals.get(id)?)
    }

    pub fn get_ballot_box(&self, id: u64) -> Result<&BallotBox> {
        Ok(self.ballots.get(id)?)
    }

    pub fn proposal_ids(&self) -> Vec<u64> {
        self.proposals.ids()
    }

    // ---- Accounting ----

    /// Verify every conservation invariant: ledger sums, and the DEX
    /// reserve backing exactly the open order escrow on both assets.
    pub fn audit(&self) -> Result<()> {
        if !self.ledger.is_balanced() {
            return Err(EngineError::Accounting(
                "ledger sums do not match supply/held currency".to_string(),
            ));
        }
        let reserve_auto = self.book.open_escrow(OrderType::Sell);
        if self.ledger.balance_of(&self.dex) != reserve_auto {
            return Err(EngineError::Accounting(format!(
                "DEX reserve AUTO {} != open sell escrow {}",
                self.ledger.balance_of(&self.dex),
                reserve_auto
            )));
        }
        let reserve_eth = self.book.open_escrow(OrderType::Buy);
        if self.ledger.eth_balance_of(&self.dex) != reserve_eth {
            return Err(EngineError::Accounting(format!(
                "DEX reserve ETH {} != open buy escrow {}",
                self.ledger.eth_balance_of(&self.dex),
                reserve_eth
            )));
        }
        for id in self.proposals.ids() {
            let proposal = self.proposals.get(id)?;
            let escrow = self.ledger.balance_of(&Self::escrow_address(id));
            let expected = if proposal.state.is_terminal() {
                0
            } else {
                proposal
                    .budget_per_period
                    .saturating_mul(proposal.remaining_periods as u128)
            };
            if escrow != expected {
                return Err(EngineError::Accounting(format!(
                    "escrow for proposal {} holds {}, expected {}",
                    id, escrow, expected
                )));
            }
        }
        Ok(())
    }

    /// Move whatever is left on a proposal's escrow account (unclaimed
    /// budget and gas pool) to the treasury.
    fn sweep_escrow(&mut self, id: u64) -> Result<()> {
        let escrow = Self::escrow_address(id);
        let treasury = self.treasury.clone();
        let auto = self.ledger.balance_of(&escrow);
        let eth = self.ledger.eth_balance_of(&escrow);
        if auto > 0 {
            self.ledger.transfer(&escrow, &treasury, auto)?;
        }
        if eth > 0 {
            self.ledger.transfer_eth(&escrow, &treasury, eth)?;
        }
        if auto > 0 || eth > 0 {
            log::info!("swept {} AUTO / {} ETH from proposal {} to treasury", auto, eth, id);
        }
        Ok(())
    }

    fn deposit_headroom(&self, payment: u128) -> Result<()> {
        self.ledger
            .held_currency()
            .checked_add(payment)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    pub fn slots(&self) -> &SlotRegistry {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex::{DexError, MIN_ORDER_AUTO, MIN_ORDER_ETH};
    use governance::config::VOTE_GAS_FEE;

    const ADMIN: &str = "0xadmin";

    /// 4 slots, trivial difficulty, one token/second of emission per
    /// slot, 10% approval, -10% contest, 10% treasury cap.
    fn engine() -> Automaton {
        let config =
            Config::new(4, 0, "0x010000", 345_600, ADMIN).with_percentages(10, -10, 10);
        Automaton::new(config).unwrap()
    }

    fn fund(engine: &mut Automaton, account: &str, auto: u128) {
        let treasury = engine.treasury_address().to_string();
        engine.transfer(&treasury, account, auto).unwrap();
    }

    fn proposal_params(periods: u64, per_period: u128) -> ProposalParams {
        ProposalParams {
            creator: ADMIN.to_string(),
            recipient: "0xdev".to_string(),
            title: "Grant".to_string(),
            description: "Fund the dev team".to_string(),
            payload: Vec::new(),
            budget_period_len: 300,
            num_periods: periods,
            budget_per_period: per_period,
        }
    }

    /// Brute-force a proof that beats the current claim key of `slot`.
    fn mine_proof(engine: &Automaton, claimer: &str, slot: u32) -> Vec<u8> {
        let max = engine.slots().slot(slot).unwrap().claim_key;
        (0u64..1_000_000)
            .map(|nonce| nonce.to_be_bytes().to_vec())
            .find(|proof| engine.slots().claim_key(claimer, proof) < max)
            .expect("no winning proof in range")
    }

    #[test]
    fn test_genesis_funds_treasury() {
        let engine = engine();
        let expected = 345_600u128 * 365;
        assert_eq!(engine.total_supply(), expected);
        assert_eq!(engine.balance_of(engine.treasury_address()), expected);
        engine.audit().unwrap();
    }

    #[test]
    fn test_set_owner_all_slots_is_admin_gated() {
        let mut engine = engine();
        assert_eq!(
            engine.set_owner_all_slots("0xmallory", 0),
            Err(EngineError::Unauthorized)
        );
        engine.set_owner_all_slots(ADMIN, 0).unwrap();
        assert_eq!(engine.slot_owner(0).unwrap().as_deref(), Some(ADMIN));
    }

    #[test]
    fn test_claim_slot_settles_evicted_owner_emission() {
        let mut engine = engine();
        engine.set_owner_all_slots(ADMIN, 0).unwrap();
        let supply_before = engine.total_supply();

        let proof = mine_proof(&engine, "0xbob", 2);
        engine
            .claim_slot("0xbob", 2, &proof, slots::SECONDS_PER_DAY)
            .unwrap();

        // One slot-day at 345_600/day over 4 slots: 86_400 AUTO minted to
        // the evicted owner.
        assert_eq!(engine.balance_of(ADMIN), 86_400);
        assert_eq!(engine.total_supply(), supply_before + 86_400);
        assert_eq!(engine.slot_owner(2).unwrap().as_deref(), Some("0xbob"));
        engine.audit().unwrap();
    }

    #[test]
    fn test_failed_sell_creates_no_order() {
        let mut engine = engine();
        let err = engine
            .sell("0xpoor", MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Ledger(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(engine.get_orders_length(), 0);
        engine.audit().unwrap();
    }

    #[test]
    fn test_buy_checks_attached_payment() {
        let mut engine = engine();
        let err = engine
            .buy("0xbuyer", MIN_ORDER_AUTO, MIN_ORDER_ETH, MIN_ORDER_ETH - 1)
            .unwrap_err();
        assert!(matches!(err, EngineError::Dex(DexError::PaymentTooLow(_))));
        assert_eq!(engine.get_orders_length(), 0);
        assert_eq!(engine.held_currency(), 0, "Rejected payment is not kept");
    }

    #[test]
    fn test_buy_excess_payment_stays_withdrawable() {
        let mut engine = engine();
        engine
            .buy("0xbuyer", MIN_ORDER_AUTO, MIN_ORDER_ETH, MIN_ORDER_ETH + 77)
            .unwrap();
        assert_eq!(engine.balance_eth("0xbuyer"), 77);
        assert_eq!(engine.balance_eth(engine.dex_address()), MIN_ORDER_ETH);
        engine.audit().unwrap();

        assert_eq!(engine.withdraw("0xbuyer", 77).unwrap(), 77);
        engine.audit().unwrap();
    }

    #[test]
    fn test_buy_now_requires_sell_order() {
        let mut engine = engine();
        engine
            .buy("0xbuyer", MIN_ORDER_AUTO, MIN_ORDER_ETH, MIN_ORDER_ETH)
            .unwrap();
        let err = engine
            .buy_now("0xtaker", 1, MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap_err();
        assert_eq!(err, EngineError::Dex(DexError::WrongOrderType(1)));
    }

    #[test]
    fn test_sell_now_price_floor() {
        let mut engine = engine();
        engine
            .buy("0xbuyer", MIN_ORDER_AUTO, MIN_ORDER_ETH, MIN_ORDER_ETH)
            .unwrap();
        fund(&mut engine, "0xtaker", MIN_ORDER_AUTO);

        // Asking for more than the order pays is refused outright.
        let err = engine
            .sell_now("0xtaker", 1, MIN_ORDER_AUTO, MIN_ORDER_ETH + 1)
            .unwrap_err();
        assert!(matches!(err, EngineError::Dex(DexError::PaymentTooLow(_))));

        engine
            .sell_now("0xtaker", 1, MIN_ORDER_AUTO, MIN_ORDER_ETH)
            .unwrap();
        assert_eq!(engine.balance_eth("0xtaker"), MIN_ORDER_ETH);
        assert_eq!(engine.balance_of("0xbuyer"), MIN_ORDER_AUTO);
        engine.audit().unwrap();
    }

    #[test]
    fn test_create_proposal_over_cap_rejected() {
        let mut engine = engine();
        let cap = engine.balance_of(engine.treasury_address()) / 10;
        let err = engine
            .create_proposal(ADMIN, proposal_params(1, cap + 1), VOTE_GAS_FEE, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Treasury(TreasuryError::BudgetExceedsCap { .. })
        ));
        assert!(engine.proposal_ids().is_empty());
        engine.audit().unwrap();
    }

    #[test]
    fn test_create_proposal_underpaid_gas_changes_nothing() {
        let mut engine = engine();
        let treasury_before = engine.balance_of(engine.treasury_address());
        let err = engine
            .create_proposal(ADMIN, proposal_params(2, 20), VOTE_GAS_FEE - 1, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Governance(GovernanceError::PaymentTooLow(_))
        ));
        assert!(engine.proposal_ids().is_empty());
        assert_eq!(engine.balance_of(engine.treasury_address()), treasury_before);
        assert_eq!(engine.held_currency(), 0);
    }

    #[test]
    fn test_create_proposal_escrows_budget_and_prepays_one_slot() {
        let mut engine = engine();
        let id = engine
            .create_proposal(ADMIN, proposal_params(2, 20), VOTE_GAS_FEE, 0)
            .unwrap();
        assert_eq!(engine.balance_of(&Automaton::escrow_address(id)), 40);
        assert_eq!(engine.unpaid_slots(id).unwrap(), 3);
        assert_eq!(engine.get_ballot_box(id).unwrap().state.code(), 1);
        assert_eq!(engine.get_proposal(id).unwrap().state.code(), 1);
        engine.audit().unwrap();
    }

    #[test]
    fn test_cast_vote_precondition_order() {
        let mut engine = engine();
        engine.set_owner_all_slots(ADMIN, 0).unwrap();
        let id = engine
            .create_proposal(ADMIN, proposal_params(2, 20), VOTE_GAS_FEE, 0)
            .unwrap();

        assert_eq!(
            engine.cast_vote(ADMIN, 200, 0, VoteChoice::Yes),
            Err(EngineError::Governance(GovernanceError::InvalidBallotId(200)))
        );
        assert_eq!(
            engine.cast_vote(ADMIN, id, 0, VoteChoice::Yes),
            Err(EngineError::Governance(GovernanceError::BallotNotActive(id)))
        );

        engine
            .pay_for_gas(ADMIN, id, 3, 3 * VOTE_GAS_FEE, 0)
            .unwrap();
        assert_eq!(
            engine.cast_vote("0xstranger", id, 0, VoteChoice::Yes),
            Err(EngineError::Governance(GovernanceError::InvalidSlotOwner {
                slot: 0
            }))
        );
        engine.cast_vote(ADMIN, id, 0, VoteChoice::Yes).unwrap();
        assert_eq!(engine.get_vote(id, 0).unwrap(), VoteChoice::Yes);
        assert_eq!(engine.get_vote_count(id, VoteChoice::Yes).unwrap(), 1);
    }

    #[test]
    fn test_pay_for_gas_too_many_slots() {
        let mut engine = engine();
        let id = engine
            .create_proposal(ADMIN, proposal_params(2, 20), VOTE_GAS_FEE, 0)
            .unwrap();
        let err = engine
            .pay_for_gas(ADMIN, id, 20, 20 * VOTE_GAS_FEE, 0)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Governance(GovernanceError::TooManySlots {
                requested: 20,
                remaining: 3,
            })
        );
        assert_eq!(engine.held_currency(), VOTE_GAS_FEE, "Only creation gas held");
    }

    #[test]
    fn test_live_ownership_check_follows_slot_transfer() {
        let mut engine = engine();
        engine.set_owner_all_slots(ADMIN, 0).unwrap();
        let id = engine
            .create_proposal(ADMIN, proposal_params(2, 20), VOTE_GAS_FEE, 0)
            .unwrap();
        engine
            .pay_for_gas(ADMIN, id, 3, 3 * VOTE_GAS_FEE, 0)
            .unwrap();
        engine.cast_vote(ADMIN, id, 1, VoteChoice::Yes).unwrap();

        // Slot 1 changes hands; the old owner loses its franchise and the
        // new owner can overwrite the recorded vote.
        let proof = mine_proof(&engine, "0xbob", 1);
        engine.claim_slot("0xbob", 1, &proof, 10).unwrap();
        assert_eq!(
            engine.cast_vote(ADMIN, id, 1, VoteChoice::Yes),
            Err(EngineError::Governance(GovernanceError::InvalidSlotOwner {
                slot: 1
            }))
        );
        engine.cast_vote("0xbob", id, 1, VoteChoice::No).unwrap();
        assert_eq!(engine.get_vote_count(id, VoteChoice::Yes).unwrap(), 0);
        assert_eq!(engine.get_vote_count(id, VoteChoice::No).unwrap(), 1);
    }
}
