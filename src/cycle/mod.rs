//! Cycle rollover records: stake snapshots, rights, per-cycle aggregates

pub mod store;

use crate::base::{address::Address, amount::Amount, Level};
use serde::{Deserialize, Serialize};

/// One cycle of the chain, created at its begin boundary together with the
/// stake snapshot used to compute rights `preserved_cycles` ahead.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub index: u32,
    pub first_level: Level,
    pub last_level: Level,
    /// active delegates above the minimal stake, sorted by descending stake
    pub snapshot: Vec<(Address, Amount)>,
    pub total_staking: Amount,
}

/// Baking right for one (level, round), computed one preserved window ahead
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct BakingRight {
    pub cycle: u32,
    pub level: Level,
    pub round: u32,
    pub baker: Address,
}

/// Per-cycle per-baker aggregate, including the frozen amounts accumulated
/// during the cycle so the unfreeze at `cycle + preserved_cycles` can move
/// exactly what was frozen.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct BakerCycle {
    pub cycle: u32,
    pub baker: Address,
    pub stake: Amount,
    pub expected_blocks: u32,
    pub expected_endorsements: u32,
    pub blocks: u32,
    pub endorsements: u32,
    pub fees: Amount,
    pub block_rewards: Amount,
    pub endorsement_rewards: Amount,
    pub deposits: Amount,
    pub unfrozen: bool,
}

impl BakerCycle {
    pub fn new(cycle: u32, baker: Address, stake: Amount) -> Self {
        Self {
            cycle,
            baker,
            stake,
            ..Self::default()
        }
    }

    /// Frozen amounts that become spendable when the cycle thaws; the
    /// deposit lock just expires and never touches the balance
    pub fn earned_total(&self) -> Amount {
        self.fees + self.block_rewards + self.endorsement_rewards
    }
}

/// Per-cycle snapshot of one delegator's stake
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct DelegatorCycle {
    pub cycle: u32,
    pub delegator: Address,
    pub delegate: Address,
    pub balance: Amount,
}
