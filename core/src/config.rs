//! Deploy-time configuration
//!
//! All parameters are fixed when the engine is constructed and immutable
//! afterwards; runtime behavior may depend on them but never change them.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of ownership slots in the contest.
    pub num_slots: u32,
    /// Leading zero bits a claim key must show.
    pub difficulty_bits: u32,
    /// 32-byte hex mask XORed into claim keys, `0x`-prefixed. Shorter
    /// values are interpreted as big-endian numbers and left-padded.
    pub mask: String,
    /// AUTO emitted per day across all slots.
    pub initial_daily_supply: u128,
    /// Vote difference (signed percent) required for acceptance.
    pub approval_percentage: i64,
    /// Vote difference (signed percent) at or below which an accepted
    /// proposal becomes contested.
    pub contest_percentage: i64,
    /// Largest share of the treasury (percent) a single proposal may
    /// request.
    pub treasury_limit_percentage: u8,
    /// Deployer account; gates the bootstrap/test helpers.
    pub admin: String,
}

impl Config {
    /// Configuration with the governance percentages left at their
    /// defaults (all zero).
    pub fn new(
        num_slots: u32,
        difficulty_bits: u32,
        mask: &str,
        initial_daily_supply: u128,
        admin: &str,
    ) -> Self {
        Self {
            num_slots,
            difficulty_bits,
            mask: mask.to_string(),
            initial_daily_supply,
            approval_percentage: 0,
            contest_percentage: 0,
            treasury_limit_percentage: 0,
            admin: admin.to_string(),
        }
    }

    pub fn with_percentages(mut self, approval: i64, contest: i64, treasury_limit: u8) -> Self {
        self.approval_percentage = approval;
        self.contest_percentage = contest;
        self.treasury_limit_percentage = treasury_limit;
        self
    }

    /// Parse the mask into its 32-byte big-endian form.
    pub fn mask_bytes(&self) -> Result<[u8; 32]> {
        let hex_str = self.mask.strip_prefix("0x").unwrap_or(&self.mask);
        let padded = if hex_str.len() % 2 == 1 {
            format!("0{}", hex_str)
        } else {
            hex_str.to_string()
        };
        let bytes = hex::decode(&padded)
            .map_err(|e| EngineError::InvalidConfig(format!("bad mask hex: {}", e)))?;
        if bytes.len() > 32 {
            return Err(EngineError::InvalidConfig(format!(
                "mask is {} bytes, expected at most 32",
                bytes.len()
            )));
        }
        let mut mask = [0u8; 32];
        mask[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(mask)
    }

    pub fn validate(&self) -> Result<()> {
        if self.treasury_limit_percentage > 100 {
            return Err(EngineError::InvalidConfig(
                "treasury limit percentage above 100".to_string(),
            ));
        }
        self.mask_bytes()?;
        Ok(())
    }
}
