//! Account entities
//!
//! Accounts are a closed set of variants over a shared base. They are
//! created on first reference (explicit origination or as counterparty of an
//! operation) and physically erased by the revert that removes their last
//! referencing operation.

pub mod store;

use crate::{
    base::{address::Address, amount::Amount, Level},
    operation::{OperationKind, OperationKinds},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum AccountDetails {
    User,
    Delegate(DelegateInfo),
    Contract(ContractInfo),
    SmartRollup(RollupInfo),
}

#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct DelegateInfo {
    /// own balance plus delegated balances and fees
    pub staking_balance: Amount,
    pub frozen_deposits: Amount,
    pub frozen_fees: Amount,
    pub frozen_rewards: Amount,
    pub delegators_count: u32,
    pub blocks_count: u32,
    pub active: bool,
    pub activation_level: Level,
    pub deactivation_level: Option<Level>,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ContractInfo {
    pub creator: Address,
    pub bigmaps_count: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RollupInfo {
    pub creator: Address,
    pub genesis_commitment: String,
    pub inbox_level: Level,
    pub total_commitments: u32,
    pub cemented_commitments: u32,
    pub active_games: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub balance: Amount,
    /// last used manager-operation counter
    pub counter: u64,
    /// whom this account delegates to (None for delegates and rollups)
    pub delegate: Option<Address>,
    pub revealed_key: Option<String>,
    /// kind K bit is set iff `op_counts[K] > 0`
    pub kinds: OperationKinds,
    /// un-reverted operations of each kind referencing this account
    pub op_counts: BTreeMap<OperationKind, u32>,
    pub migrations_count: u32,
    pub first_level: Level,
    pub last_level: Level,
    pub details: AccountDetails,
}

//////////
// impl //
//////////

impl Account {
    pub fn new_user(address: Address, level: Level) -> Self {
        Self {
            address,
            balance: Amount::default(),
            counter: 0,
            delegate: None,
            revealed_key: None,
            kinds: OperationKinds::default(),
            op_counts: BTreeMap::new(),
            migrations_count: 0,
            first_level: level,
            last_level: level,
            details: AccountDetails::User,
        }
    }

    pub fn new_contract(address: Address, creator: Address, level: Level) -> Self {
        Self {
            details: AccountDetails::Contract(ContractInfo {
                creator,
                bigmaps_count: 0,
            }),
            ..Self::new_user(address, level)
        }
    }

    pub fn new_rollup(
        address: Address,
        creator: Address,
        genesis_commitment: String,
        level: Level,
    ) -> Self {
        Self {
            details: AccountDetails::SmartRollup(RollupInfo {
                creator,
                genesis_commitment,
                inbox_level: level,
                total_commitments: 0,
                cemented_commitments: 0,
                active_games: 0,
            }),
            ..Self::new_user(address, level)
        }
    }

    pub fn is_delegate(&self) -> bool {
        matches!(self.details, AccountDetails::Delegate(_))
    }

    pub fn as_delegate(&self) -> Option<&DelegateInfo> {
        match &self.details {
            AccountDetails::Delegate(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_delegate_mut(&mut self) -> Option<&mut DelegateInfo> {
        match &mut self.details {
            AccountDetails::Delegate(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_rollup_mut(&mut self) -> Option<&mut RollupInfo> {
        match &mut self.details {
            AccountDetails::SmartRollup(info) => Some(info),
            _ => None,
        }
    }

    /// Record one more un-reverted operation of `kind` referencing this
    /// account.
    pub fn add_op(&mut self, kind: OperationKind, level: Level) {
        *self.op_counts.entry(kind).or_insert(0) += 1;
        self.kinds.insert(kind);
        self.last_level = level;
    }

    /// Undo [add_op]. The kind bit is cleared exactly when the count of
    /// un-reverted operations of that kind returns to zero.
    pub fn remove_op(&mut self, kind: OperationKind) {
        match self.op_counts.get_mut(&kind) {
            Some(count) if *count > 1 => *count -= 1,
            _ => {
                self.op_counts.remove(&kind);
                self.kinds.remove(kind);
            }
        }
    }

    /// A revert may erase an account exactly as if it never existed: no
    /// un-reverted operations reference it and every counter is back at its
    /// initial value. Only plain user accounts qualify; delegates hold
    /// frozen amounts outside `balance` and contracts and rollups are
    /// erased explicitly by the revert of their origination.
    pub fn is_erasable(&self) -> bool {
        matches!(self.details, AccountDetails::User)
            && self.kinds.is_empty()
            && self.counter == 0
            && self.migrations_count == 0
            && self.balance.is_zero()
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Account;
    use crate::{base::address::Address, operation::OperationKind};

    #[test]
    fn kind_bit_follows_op_count() {
        let mut account =
            Account::new_user(Address::new("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb"), 5);

        account.add_op(OperationKind::Transaction, 5);
        account.add_op(OperationKind::Transaction, 6);
        assert!(account.kinds.contains(OperationKind::Transaction));

        account.remove_op(OperationKind::Transaction);
        assert!(account.kinds.contains(OperationKind::Transaction));

        account.remove_op(OperationKind::Transaction);
        assert!(!account.kinds.contains(OperationKind::Transaction));
        assert!(account.is_erasable());
    }
}
