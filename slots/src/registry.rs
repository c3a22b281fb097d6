//! Slot registry and claim validation
//!
//! A claim is scored by `Keccak256(claimer || proof) XOR mask`. Lower keys
//! represent more work. A key wins a slot when it meets the global
//! difficulty target and is strictly lower than the key that last won the
//! slot, so holding a slot always costs more than it cost the previous
//! owner.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::{Result, SlotError};
use crate::SECONDS_PER_DAY;

/// One ownership slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    /// Current owner address, if any.
    pub owner: Option<String>,
    /// Key of the claim that currently holds the slot. Unowned slots carry
    /// the difficulty target itself, so any conforming key wins them.
    pub claim_key: [u8; 32],
    /// Timestamp of the winning claim; emission accrues from here.
    pub claimed_at: u64,
}

/// Outcome of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    /// Evicted owner and the seconds they held the slot.
    pub evicted: Option<(String, u64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRegistry {
    slots: Vec<Slot>,
    difficulty_bits: u32,
    mask: [u8; 32],
}

impl SlotRegistry {
    pub fn new(num_slots: u32, difficulty_bits: u32, mask: [u8; 32]) -> Self {
        let target = difficulty_target(difficulty_bits);
        let slots = (0..num_slots)
            .map(|_| Slot {
                owner: None,
                claim_key: target,
                claimed_at: 0,
            })
            .collect();
        Self {
            slots,
            difficulty_bits,
            mask,
        }
    }

    pub fn num_slots(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn slot(&self, index: u32) -> Result<&Slot> {
        self.slots
            .get(index as usize)
            .ok_or(SlotError::InvalidSlot {
                index,
                num_slots: self.slots.len() as u32,
            })
    }

    pub fn owner_of(&self, index: u32) -> Result<Option<&str>> {
        Ok(self.slot(index)?.owner.as_deref())
    }

    /// Whether `account` currently owns `index`. Out-of-range indexes are
    /// simply not owned.
    pub fn is_owner(&self, index: u32, account: &str) -> bool {
        self.slots
            .get(index as usize)
            .map(|s| s.owner.as_deref() == Some(account))
            .unwrap_or(false)
    }

    /// Compute the claim key `claimer` would submit with `proof`.
    pub fn claim_key(&self, claimer: &str, proof: &[u8]) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(claimer.as_bytes());
        hasher.update(proof);
        let digest: [u8; 32] = hasher.finalize().into();
        let mut key = [0u8; 32];
        for (i, b) in digest.iter().enumerate() {
            key[i] = b ^ self.mask[i];
        }
        key
    }

    /// Attempt to claim `index` for `claimer`. Returns the evicted owner so
    /// the caller can settle their accrued emission.
    pub fn claim(
        &mut self,
        index: u32,
        claimer: &str,
        proof: &[u8],
        now: u64,
    ) -> Result<ClaimOutcome> {
        let key = self.claim_key(claimer, proof);
        let target = difficulty_target(self.difficulty_bits);
        let num_slots = self.slots.len() as u32;
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or(SlotError::InvalidSlot { index, num_slots })?;

        // Must meet the global target and beat the incumbent's key.
        if key >= target || key >= slot.claim_key {
            return Err(SlotError::InsufficientWork);
        }

        let evicted = slot
            .owner
            .take()
            .map(|owner| (owner, now.saturating_sub(slot.claimed_at)));
        slot.owner = Some(claimer.to_string());
        slot.claim_key = key;
        slot.claimed_at = now;

        log::info!(
            "slot {} claimed by {} (key {})",
            index,
            claimer,
            hex::encode(key)
        );
        Ok(ClaimOutcome { evicted })
    }

    /// Bootstrap/test override: hand every slot to `owner` without a proof.
    /// Claim keys are left untouched so real claims still have to beat the
    /// recorded work. Authorization is the caller's responsibility.
    pub fn set_owner_all(&mut self, owner: &str, now: u64) {
        for slot in &mut self.slots {
            slot.owner = Some(owner.to_string());
            slot.claimed_at = now;
        }
        log::info!("all {} slots assigned to {}", self.slots.len(), owner);
    }
}

/// Exclusive upper bound a claim key must stay under to show
/// `difficulty_bits` leading zero bits of work, i.e. `2^(256 - bits)`.
pub fn difficulty_target(difficulty_bits: u32) -> [u8; 32] {
    let mut target = [0u8; 32];
    if difficulty_bits == 0 {
        return [0xff; 32];
    }
    if difficulty_bits > 256 {
        return target;
    }
    let bit_index = difficulty_bits - 1;
    target[(bit_index / 8) as usize] = 0x80u8 >> (bit_index % 8);
    target
}

/// Token emission owed to a slot owner for `held_seconds` of tenure. The
/// daily supply is split evenly across slots; division floors.
pub fn accrued_emission(daily_supply: u128, held_seconds: u64, num_slots: u32) -> u128 {
    if num_slots == 0 {
        return 0;
    }
    daily_supply.saturating_mul(held_seconds as u128)
        / (SECONDS_PER_DAY as u128 * num_slots as u128)
}
