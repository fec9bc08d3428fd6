//! Indexed block records and the raw node payload

pub mod raw;
pub mod store;

use crate::{
    base::{address::Address, amount::Amount, Level},
    operation::OperationKinds,
};
use serde::{Deserialize, Serialize};

//////////////////////
// structural events//
//////////////////////

/// Bitset of structural events observed at a block boundary
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default, Hash, Serialize, Deserialize,
)]
pub struct BlockEvents(pub u32);

impl BlockEvents {
    pub const CYCLE_BEGIN: u32 = 1;
    pub const CYCLE_END: u32 = 1 << 1;
    pub const PROTOCOL_BEGIN: u32 = 1 << 2;
    pub const VOTING_PERIOD_BEGIN: u32 = 1 << 3;
    pub const VOTING_PERIOD_END: u32 = 1 << 4;
    pub const DEACTIVATIONS: u32 = 1 << 5;

    pub fn contains(&self, event: u32) -> bool {
        self.0 & event != 0
    }

    pub fn insert(&mut self, event: u32) {
        self.0 |= event;
    }

    pub fn remove(&mut self, event: u32) {
        self.0 &= !event;
    }
}

///////////
// block //
///////////

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Block {
    pub level: Level,
    pub hash: String,
    pub timestamp: i64,
    pub baker: Address,
    pub protocol: u32,
    pub cycle: u32,
    pub voting_period: u32,
    /// operation kinds present in this block
    pub kinds: OperationKinds,
    pub events: BlockEvents,
    pub reward: Amount,
    pub fees: Amount,
    /// bakers deactivated at this block (cycle-end stake check)
    pub deactivated: Vec<Address>,
    /// baker last-activity level before this block, restored on revert
    pub baker_prev_level: Level,
}
