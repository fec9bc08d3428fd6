//! Protocol versions and their constant parameters
//!
//! Per-version behavior is data, not inheritance: a version-indexed
//! parameter table plus an ordered migration list keyed by
//! `(from, to)` (see [activator]).

pub mod activator;
pub mod store;

use crate::base::{address::Address, amount::Amount, Level};
use serde::{Deserialize, Serialize};

/// Constant parameters of one protocol version, installed at activation
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ProtocolParams {
    pub cycle_length: u32,
    pub blocks_per_voting_period: u32,
    /// cycles between a stake snapshot and the rights computed from it,
    /// also the freeze duration of deposits, fees and rewards
    pub preserved_cycles: u32,
    pub hard_gas_limit_per_operation: u64,
    pub hard_gas_limit_per_block: u64,
    pub minimal_stake: Amount,
    pub block_reward: Amount,
    pub block_deposit: Amount,
    pub endorsement_reward: Amount,
    pub endorsers_per_block: u32,
    pub nonce_revelation_reward: Amount,
    pub smart_rollup_commitment_bond: Amount,
    /// account whose proposals meet the acceptance threshold unconditionally
    pub dictator: Option<Address>,
}

impl ProtocolParams {
    /// Parameter table, one row per known protocol version
    pub fn for_version(version: u32) -> Self {
        let base = Self {
            cycle_length: 4096,
            blocks_per_voting_period: 20_480,
            preserved_cycles: 5,
            hard_gas_limit_per_operation: 1_040_000,
            hard_gas_limit_per_block: 5_200_000,
            minimal_stake: Amount::new(6_000),
            block_reward: Amount::new(10),
            block_deposit: Amount::new(640),
            endorsement_reward: Amount(1_250_000),
            endorsers_per_block: 32,
            nonce_revelation_reward: Amount(125_000),
            smart_rollup_commitment_bond: Amount::new(10_000),
            dictator: None,
        };
        // v2 halves the gas limits and enables rollups
        let v2 = Self {
            hard_gas_limit_per_operation: 520_000,
            hard_gas_limit_per_block: 2_600_000,
            ..base.clone()
        };
        match version {
            0 | 1 => base,
            2 => v2,
            // v3 installs the governance dictator
            _ => Self {
                dictator: Some(Address::new(crate::constants::PROTO3_DICTATOR_ADDRESS)),
                ..v2
            },
        }
    }

    pub fn cycle_of(&self, level: Level) -> u32 {
        (level - 1) / self.cycle_length
    }

    pub fn voting_period_of(&self, level: Level) -> u32 {
        (level - 1) / self.blocks_per_voting_period
    }

    pub fn first_level_of_cycle(&self, cycle: u32) -> Level {
        cycle * self.cycle_length + 1
    }

    pub fn last_level_of_cycle(&self, cycle: u32) -> Level {
        (cycle + 1) * self.cycle_length
    }
}

/// An activated protocol version.
///
/// `weight` counts the not-yet-reverted blocks attributed to this version;
/// the row is dropped when a revert takes it back to zero.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub version: u32,
    pub first_level: Level,
    pub weight: u32,
    pub params: ProtocolParams,
}

impl Protocol {
    pub fn activate(version: u32, first_level: Level) -> Self {
        Self {
            version,
            first_level,
            weight: 0,
            params: ProtocolParams::for_version(version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProtocolParams;

    #[test]
    fn cycle_boundaries() {
        let params = ProtocolParams {
            cycle_length: 8,
            ..ProtocolParams::for_version(1)
        };

        assert_eq!(0, params.cycle_of(1));
        assert_eq!(0, params.cycle_of(8));
        assert_eq!(1, params.cycle_of(9));
        assert_eq!(9, params.first_level_of_cycle(1));
        assert_eq!(16, params.last_level_of_cycle(1));
    }
}
