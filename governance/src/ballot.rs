//! Ballot box state machine
//!
//! States move strictly forward: `Uninitialized → PrepayingGas → Active →
//! Inactive`. Votes are per-slot and overwritable; tallies are adjusted by
//! delta on every change so counts never drift from the per-slot records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, Result};

/// Lifecycle of a ballot box. Wire/getter encoding follows the variant
/// order: Uninitialized = 0 … Inactive = 3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BallotState {
    Uninitialized,
    PrepayingGas,
    Active,
    Inactive,
}

impl BallotState {
    pub fn code(self) -> u8 {
        match self {
            BallotState::Uninitialized => 0,
            BallotState::PrepayingGas => 1,
            BallotState::Active => 2,
            BallotState::Inactive => 3,
        }
    }
}

/// A slot's recorded vote. Wire/getter encoding: None = 0, Yes = 1, No = 2.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VoteChoice {
    None,
    Yes,
    No,
}

impl VoteChoice {
    pub fn code(self) -> u8 {
        match self {
            VoteChoice::None => 0,
            VoteChoice::Yes => 1,
            VoteChoice::No => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(VoteChoice::None),
            1 => Ok(VoteChoice::Yes),
            2 => Ok(VoteChoice::No),
            _ => Err(GovernanceError::InvalidVote),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BallotBox {
    pub id: u64,
    pub state: BallotState,
    num_slots: u32,
    slots_paid: u32,
    votes: Vec<VoteChoice>,
    yes_count: u32,
    no_count: u32,
    /// When the ballot became Active; proposal evaluation is timed from
    /// here.
    pub activation_time: u64,
}

impl BallotBox {
    /// Create a ballot over `num_slots` voting slots. A ballot with no
    /// eligible slots has no gas to collect and activates immediately.
    pub fn new(id: u64, num_slots: u32, now: u64) -> Self {
        let mut ballot = Self {
            id,
            state: BallotState::PrepayingGas,
            num_slots,
            slots_paid: 0,
            votes: vec![VoteChoice::None; num_slots as usize],
            yes_count: 0,
            no_count: 0,
            activation_time: 0,
        };
        if num_slots == 0 {
            ballot.state = BallotState::Active;
            ballot.activation_time = now;
        }
        ballot
    }

    pub fn num_slots(&self) -> u32 {
        self.num_slots
    }

    pub fn unpaid_slots(&self) -> u32 {
        self.num_slots - self.slots_paid
    }

    pub fn is_active(&self) -> bool {
        self.state == BallotState::Active
    }

    /// Record gas payment for `slots_to_pay` more slots. Activates the
    /// ballot exactly when the last unpaid slot is covered.
    pub fn pay_for_gas(&mut self, slots_to_pay: u32, now: u64) -> Result<()> {
        let remaining = self.unpaid_slots();
        if slots_to_pay > remaining {
            return Err(GovernanceError::TooManySlots {
                requested: slots_to_pay,
                remaining,
            });
        }
        self.slots_paid += slots_to_pay;
        if self.state == BallotState::PrepayingGas && self.slots_paid == self.num_slots {
            self.state = BallotState::Active;
            self.activation_time = now;
            log::info!("ballot {} active at {}", self.id, now);
        }
        Ok(())
    }

    /// Cast or change the vote for `slot`. Tallies move by delta, so
    /// re-casting the same choice is a no-op and switching sides adjusts
    /// both buckets. Slot ownership is validated by the caller.
    pub fn cast_vote(&mut self, slot: u32, choice: VoteChoice) -> Result<()> {
        if self.state != BallotState::Active {
            return Err(GovernanceError::BallotNotActive(self.id));
        }
        if choice == VoteChoice::None {
            return Err(GovernanceError::InvalidVote);
        }
        let vote = self
            .votes
            .get_mut(slot as usize)
            .ok_or(GovernanceError::InvalidSlot(slot))?;

        let previous = *vote;
        if previous == choice {
            return Ok(());
        }
        match previous {
            VoteChoice::Yes => self.yes_count -= 1,
            VoteChoice::No => self.no_count -= 1,
            VoteChoice::None => {}
        }
        match choice {
            VoteChoice::Yes => self.yes_count += 1,
            VoteChoice::No => self.no_count += 1,
            VoteChoice::None => unreachable!(),
        }
        *vote = choice;
        log::debug!(
            "ballot {} slot {} voted {:?} ({} yes / {} no)",
            self.id,
            slot,
            choice,
            self.yes_count,
            self.no_count
        );
        Ok(())
    }

    pub fn vote_of(&self, slot: u32) -> Result<VoteChoice> {
        self.votes
            .get(slot as usize)
            .copied()
            .ok_or(GovernanceError::InvalidSlot(slot))
    }

    /// Number of slots currently voting `choice`; `None` counts the slots
    /// that have not voted.
    pub fn vote_count(&self, choice: VoteChoice) -> u32 {
        match choice {
            VoteChoice::Yes => self.yes_count,
            VoteChoice::No => self.no_count,
            VoteChoice::None => self.num_slots - self.yes_count - self.no_count,
        }
    }

    /// Signed percentage `(yes - no) * 100 / num_slots`, truncated toward
    /// zero. The sole decision metric for proposal thresholds.
    pub fn vote_difference(&self) -> i64 {
        if self.num_slots == 0 {
            return 0;
        }
        (self.yes_count as i64 - self.no_count as i64) * 100 / self.num_slots as i64
    }

    /// One-way transition to Inactive. Safe to call repeatedly.
    pub fn deactivate(&mut self) {
        if self.state != BallotState::Inactive {
            log::info!("ballot {} deactivated", self.id);
            self.state = BallotState::Inactive;
        }
    }
}

/// Arena of ballot boxes keyed by proposal id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BallotRegistry {
    boxes: HashMap<u64, BallotBox>,
}

impl BallotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, id: u64, num_slots: u32, now: u64) -> &mut BallotBox {
        self.boxes.entry(id).or_insert_with(|| BallotBox::new(id, num_slots, now))
    }

    pub fn get(&self, id: u64) -> Result<&BallotBox> {
        self.boxes.get(&id).ok_or(GovernanceError::InvalidBallotId(id))
    }

    pub fn get_mut(&mut self, id: u64) -> Result<&mut BallotBox> {
        self.boxes
            .get_mut(&id)
            .ok_or(GovernanceError::InvalidBallotId(id))
    }
}
