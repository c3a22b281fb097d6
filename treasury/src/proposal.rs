//! Proposal lifecycle and budget-period accounting
//!
//! The lifecycle is advanced only by the permissionless `update_state`
//! tick, a pure function of stored timestamps, the current time and the
//! ballot's vote difference. Claim arithmetic always splits a period's
//! full budget between recipient and treasury, so escrow drains exactly
//! `budget_per_period` per eligible period with no rounding residue.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::FIRST_PROPOSAL_ID;
use crate::error::{Result, TreasuryError};

/// Lifecycle of a proposal. Wire/getter encoding follows the variant
/// order: Uninitialized = 0 … Completed = 5.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProposalState {
    Uninitialized,
    Started,
    Accepted,
    Rejected,
    Contested,
    Completed,
}

impl ProposalState {
    pub fn code(self) -> u8 {
        match self {
            ProposalState::Uninitialized => 0,
            ProposalState::Started => 1,
            ProposalState::Accepted => 2,
            ProposalState::Rejected => 3,
            ProposalState::Contested => 4,
            ProposalState::Completed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProposalState::Rejected | ProposalState::Completed)
    }
}

/// What an `update_state` tick did, so the caller can settle escrow and
/// deactivate the ballot where required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Accepted,
    Rejected,
    Contested,
}

/// Parameters for creating a new proposal.
#[derive(Debug, Clone)]
pub struct ProposalParams {
    pub creator: String,
    pub recipient: String,
    pub title: String,
    pub description: String,
    pub payload: Vec<u8>,
    pub budget_period_len: u64,
    pub num_periods: u64,
    pub budget_per_period: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proposal {
    pub id: u64,
    pub creator: String,
    /// Designated beneficiary; every claim pays here regardless of caller.
    pub recipient: String,
    pub title: String,
    pub description: String,
    pub payload: Vec<u8>,
    pub state: ProposalState,
    pub start_time: u64,
    /// End of the current contest window; meaningful only while Contested.
    pub contest_deadline: u64,
    pub budget_period_len: u64,
    pub remaining_periods: u64,
    pub budget_per_period: u128,
    /// Claim clock. Zero until initial acceptance, then advanced by whole
    /// claimed periods only, so partial-period time is never lost.
    pub last_claim_time: u64,
}

impl Proposal {
    fn new(id: u64, params: ProposalParams, now: u64) -> Result<Self> {
        if params.num_periods > 0 && params.budget_period_len == 0 {
            return Err(TreasuryError::InvalidPeriodLength);
        }
        Ok(Self {
            id,
            creator: params.creator,
            recipient: params.recipient,
            title: params.title,
            description: params.description,
            payload: params.payload,
            state: ProposalState::Started,
            start_time: now,
            contest_deadline: 0,
            budget_period_len: params.budget_period_len,
            remaining_periods: params.num_periods,
            budget_per_period: params.budget_per_period,
            last_claim_time: 0,
        })
    }

    /// Total budget escrowed at creation.
    pub fn requested_budget(&self) -> u128 {
        self.budget_per_period
            .saturating_mul(self.remaining_periods as u128)
    }

    /// Advance the lifecycle. `activation_time` is the ballot's activation
    /// timestamp, `None` while gas is still being prepaid. Idempotent:
    /// with no elapsed time and no vote movement a second call is a no-op.
    pub fn update_state(
        &mut self,
        now: u64,
        activation_time: Option<u64>,
        vote_difference: i64,
        approval_percentage: i64,
        contest_percentage: i64,
        start_period: u64,
        contest_period: u64,
    ) -> Transition {
        let transition = match self.state {
            ProposalState::Started => {
                let Some(activated) = activation_time else {
                    return Transition::None;
                };
                if now < activated + start_period {
                    return Transition::None;
                }
                if vote_difference >= approval_percentage {
                    self.state = ProposalState::Accepted;
                    // The claim clock starts at initial acceptance.
                    self.last_claim_time = now;
                    Transition::Accepted
                } else {
                    self.state = ProposalState::Rejected;
                    Transition::Rejected
                }
            }
            ProposalState::Accepted => {
                if vote_difference <= contest_percentage {
                    self.state = ProposalState::Contested;
                    self.contest_deadline = now + contest_period;
                    Transition::Contested
                } else {
                    Transition::None
                }
            }
            ProposalState::Contested => {
                if now < self.contest_deadline {
                    return Transition::None;
                }
                if vote_difference >= approval_percentage {
                    self.state = ProposalState::Accepted;
                    Transition::Accepted
                } else {
                    self.state = ProposalState::Rejected;
                    Transition::Rejected
                }
            }
            _ => Transition::None,
        };
        if transition != Transition::None {
            log::info!(
                "proposal {} -> {:?} (vote difference {})",
                self.id,
                self.state,
                vote_difference
            );
        }
        transition
    }

    /// Whole periods claimable at `now`, capped by what is left.
    pub fn eligible_periods(&self, now: u64) -> u64 {
        if self.budget_period_len == 0 || self.last_claim_time == 0 {
            return 0;
        }
        let elapsed = now.saturating_sub(self.last_claim_time) / self.budget_period_len;
        elapsed.min(self.remaining_periods)
    }

    /// Claim `amount` per eligible period for the recipient. The remainder
    /// of each period's budget is returned for the treasury, so escrow
    /// drains by exactly `budget_per_period * eligible` every claim.
    pub fn claim(&mut self, amount: u128, now: u64) -> Result<ClaimOutcome> {
        if self.state != ProposalState::Accepted {
            return Err(TreasuryError::WrongProposalState { state: self.state });
        }
        if amount > self.budget_per_period {
            return Err(TreasuryError::BudgetExceeded {
                requested: amount,
                cap: self.budget_per_period,
            });
        }
        let eligible = self.eligible_periods(now);
        if eligible == 0 {
            return Err(TreasuryError::BudgetExceeded {
                requested: amount,
                cap: 0,
            });
        }

        let to_recipient = amount
            .checked_mul(eligible as u128)
            .ok_or(TreasuryError::Overflow)?;
        let to_treasury = (self.budget_per_period - amount)
            .checked_mul(eligible as u128)
            .ok_or(TreasuryError::Overflow)?;

        self.last_claim_time += eligible * self.budget_period_len;
        self.remaining_periods -= eligible;
        let completed = self.remaining_periods == 0;
        if completed {
            self.state = ProposalState::Completed;
        }

        log::info!(
            "proposal {} claimed {} periods: {} to recipient, {} to treasury{}",
            self.id,
            eligible,
            to_recipient,
            to_treasury,
            if completed { " (completed)" } else { "" }
        );
        Ok(ClaimOutcome {
            eligible_periods: eligible,
            to_recipient,
            to_treasury,
            completed,
        })
    }

}

/// Result of a successful reward claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub eligible_periods: u64,
    pub to_recipient: u128,
    pub to_treasury: u128,
    pub completed: bool,
}

/// Reject a requested budget that exceeds the treasury percentage cap.
pub fn check_budget_cap(
    requested: u128,
    treasury_balance: u128,
    limit_percentage: u8,
) -> Result<()> {
    let cap = treasury_balance
        .checked_mul(limit_percentage as u128)
        .ok_or(TreasuryError::Overflow)?
        / 100;
    if requested > cap {
        return Err(TreasuryError::BudgetExceedsCap { requested, cap });
    }
    Ok(())
}

/// Arena of proposals keyed by monotonic id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRegistry {
    proposals: HashMap<u64, Proposal>,
    next_id: u64,
}

impl Default for ProposalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self {
            proposals: HashMap::new(),
            next_id: FIRST_PROPOSAL_ID,
        }
    }

    /// Create a proposal in the Started state and return its id.
    pub fn create(&mut self, params: ProposalParams, now: u64) -> Result<u64> {
        let id = self.next_id;
        let proposal = Proposal::new(id, params, now)?;
        self.next_id += 1;
        self.proposals.insert(id, proposal);
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Result<&Proposal> {
        self.proposals
            .get(&id)
            .ok_or(TreasuryError::ProposalNotFound(id))
    }

    pub fn get_mut(&mut self, id: u64) -> Result<&mut Proposal> {
        self.proposals
            .get_mut(&id)
            .ok_or(TreasuryError::ProposalNotFound(id))
    }

    /// Ids of every proposal ever created, ascending.
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.proposals.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
