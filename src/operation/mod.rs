//! Operation kinds and persisted operation records
//!
//! One record is persisted per operation instance. The payload carries
//! everything the matching revert needs to restore the touched entities
//! exactly (previous counters, previous delegates, slashed amounts, ...).

pub mod parse;
pub mod store;

use crate::{
    base::{address::Address, amount::Amount, op_hash::OpHash, Level},
    protocol::activator::MigrationKind,
    voting::{ProposalHash, Vote},
};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize,
)]
pub enum OperationKind {
    // consensus
    Endorsement,
    Preendorsement,
    // governance
    Proposal,
    Ballot,
    // anomaly
    Activation,
    DoubleBaking,
    DoubleEndorsing,
    DoublePreendorsing,
    NonceRevelation,
    VdfRevelation,
    DrainDelegate,
    // manager
    Reveal,
    Delegation,
    Origination,
    Transaction,
    TransferTicket,
    SmartRollupOriginate,
    SmartRollupAddMessages,
    SmartRollupCement,
    SmartRollupPublish,
    SmartRollupRefute,
    SmartRollupTimeout,
    SmartRollupRecoverBond,
    SmartRollupExecute,
    // internal effects
    Event,
    // protocol upgrades
    Migration,
}

impl OperationKind {
    /// First protocol version that defines this kind
    pub fn min_version(&self) -> u32 {
        use OperationKind::*;
        match self {
            Preendorsement | DoublePreendorsing | VdfRevelation | DrainDelegate
            | TransferTicket | SmartRollupOriginate | SmartRollupAddMessages
            | SmartRollupCement | SmartRollupPublish | SmartRollupRefute
            | SmartRollupTimeout | SmartRollupRecoverBond | SmartRollupExecute => 2,
            _ => 1,
        }
    }

    /// Kind requiring sender fee/counter/gas accounting
    pub fn is_manager(&self) -> bool {
        use OperationKind::*;
        matches!(
            self,
            Reveal
                | Delegation
                | Origination
                | Transaction
                | TransferTicket
                | SmartRollupOriginate
                | SmartRollupAddMessages
                | SmartRollupCement
                | SmartRollupPublish
                | SmartRollupRefute
                | SmartRollupTimeout
                | SmartRollupRecoverBond
                | SmartRollupExecute
        )
    }
}

/////////////////////
// operation kinds //
/////////////////////

/// Bitset of operation kinds, kept on accounts and blocks.
/// A kind bit is set iff at least one un-reverted operation of that kind
/// references the holder.
#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default, Hash, Serialize, Deserialize,
)]
pub struct OperationKinds(pub u64);

impl OperationKinds {
    pub fn contains(&self, kind: OperationKind) -> bool {
        self.0 & (1 << kind as u64) != 0
    }

    pub fn insert(&mut self, kind: OperationKind) {
        self.0 |= 1 << kind as u64;
    }

    pub fn remove(&mut self, kind: OperationKind) {
        self.0 &= !(1 << kind as u64);
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

////////////
// status //
////////////

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum OperationStatus {
    Applied,
    Failed,
}

impl OperationStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/////////////
// payload //
/////////////

/// Fee/counter/gas accounting context of a manager operation.
/// `prev_counter` is the sender's counter before the apply.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ManagerInfo {
    pub fee: Amount,
    pub counter: u64,
    pub gas_limit: u64,
    pub storage_limit: u64,
    pub prev_counter: u64,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum OperationPayload {
    Endorsement {
        slots: u32,
    },
    Preendorsement {
        slots: u32,
    },
    Proposal {
        proposal: ProposalHash,
        period: u32,
        dictator: bool,
    },
    Ballot {
        proposal: ProposalHash,
        period: u32,
        vote: Vote,
    },
    Activation {
        amount: Amount,
    },
    DoubleBaking {
        accused_level: Level,
        slashed: Amount,
        reward: Amount,
    },
    DoubleEndorsing {
        accused_level: Level,
        slashed: Amount,
        reward: Amount,
    },
    DoublePreendorsing {
        accused_level: Level,
        slashed: Amount,
        reward: Amount,
    },
    NonceRevelation {
        revealed_level: Level,
        reward: Amount,
    },
    VdfRevelation {
        reward: Amount,
    },
    DrainDelegate {
        amount: Amount,
    },
    Reveal {
        manager: ManagerInfo,
        public_key: String,
        prev_public_key: Option<String>,
    },
    Delegation {
        manager: Option<ManagerInfo>,
        new_delegate: Option<Address>,
        prev_delegate: Option<Address>,
        /// delegated balance moved between staking balances
        moved: Amount,
        /// self-delegation that registered the sender as a delegate
        registered: bool,
    },
    Origination {
        manager: Option<ManagerInfo>,
        contract: Address,
        contract_balance: Amount,
    },
    Transaction {
        manager: Option<ManagerInfo>,
        amount: Amount,
        entrypoint: Option<String>,
    },
    TransferTicket {
        manager: ManagerInfo,
        transfers: u32,
    },
    SmartRollupOriginate {
        manager: ManagerInfo,
        rollup: Address,
        genesis_commitment: String,
    },
    SmartRollupAddMessages {
        manager: ManagerInfo,
        messages: u32,
        prev_inbox_level: Level,
    },
    SmartRollupCement {
        manager: ManagerInfo,
        commitment: String,
    },
    SmartRollupPublish {
        manager: ManagerInfo,
        commitment: String,
        bond: Amount,
    },
    SmartRollupRefute {
        manager: ManagerInfo,
        game_id: u64,
        started: bool,
        prev_last_level: Level,
    },
    SmartRollupTimeout {
        manager: ManagerInfo,
        game_id: u64,
        slashed: Amount,
        reward: Amount,
    },
    SmartRollupRecoverBond {
        manager: ManagerInfo,
        bond: Amount,
    },
    SmartRollupExecute {
        manager: ManagerInfo,
        commitment: String,
    },
    Event {
        tag: String,
    },
    Migration {
        kind: MigrationKind,
        balance_change: i64,
    },
}

////////////
// record //
////////////

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: u64,
    pub level: Level,
    pub timestamp: i64,
    pub hash: OpHash,
    pub kind: OperationKind,
    pub sender: Address,
    pub target: Option<Address>,
    /// Set on operations emitted as internal effects of a manager operation
    pub initiator: Option<Address>,
    pub status: OperationStatus,
    /// Last-activity level each referenced account had before this
    /// operation, in reference order. The revert restores the first entry
    /// per account, the value from before the whole operation.
    pub prev_levels: Vec<(Address, Level)>,
    pub payload: OperationPayload,
}

impl Operation {
    /// Pre-operation last-activity level of `addr`, if this operation
    /// touched it
    pub fn prev_level_of(&self, addr: &Address) -> Option<Level> {
        self.prev_levels
            .iter()
            .find(|(a, _)| a == addr)
            .map(|(_, level)| *level)
    }
}

impl Operation {
    pub fn manager_info(&self) -> Option<&ManagerInfo> {
        use OperationPayload::*;
        match &self.payload {
            Reveal { manager, .. } => Some(manager),
            Delegation { manager, .. }
            | Origination { manager, .. }
            | Transaction { manager, .. } => manager.as_ref(),
            TransferTicket { manager, .. }
            | SmartRollupOriginate { manager, .. }
            | SmartRollupAddMessages { manager, .. }
            | SmartRollupCement { manager, .. }
            | SmartRollupPublish { manager, .. }
            | SmartRollupRefute { manager, .. }
            | SmartRollupTimeout { manager, .. }
            | SmartRollupRecoverBond { manager, .. }
            | SmartRollupExecute { manager, .. } => Some(manager),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OperationKind, OperationKinds};

    #[test]
    fn bitset_insert_remove() {
        let mut kinds = OperationKinds::default();
        assert!(kinds.is_empty());

        kinds.insert(OperationKind::Reveal);
        kinds.insert(OperationKind::Transaction);
        assert!(kinds.contains(OperationKind::Reveal));
        assert!(kinds.contains(OperationKind::Transaction));
        assert!(!kinds.contains(OperationKind::Ballot));

        kinds.remove(OperationKind::Reveal);
        assert!(!kinds.contains(OperationKind::Reveal));
        assert!(kinds.contains(OperationKind::Transaction));

        kinds.remove(OperationKind::Transaction);
        assert!(kinds.is_empty());
    }

    #[test]
    fn rollup_kinds_need_version_two() {
        assert_eq!(1, OperationKind::Transaction.min_version());
        assert_eq!(2, OperationKind::SmartRollupPublish.min_version());
    }
}
