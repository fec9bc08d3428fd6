//! This module contains the implementations of all store traits for the
//! [IndexerStore]

// traits
pub mod column_families;
pub mod fixed_keys;

// impls
pub mod account_store_impl;
pub mod bigmap_store_impl;
pub mod block_store_impl;
pub mod column_families_impl;
pub mod cycle_store_impl;
pub mod operation_store_impl;
pub mod protocol_store_impl;
pub mod rollup_store_impl;
pub mod state_store_impl;
pub mod ticket_store_impl;
pub mod voting_store_impl;

use crate::{
    account::Account,
    base::{address::Address, Level},
    block::Block,
    commit::{bigmap::BigMapUpdate, tickets::TicketTransfer},
    cycle::{BakerCycle, BakingRight, Cycle, DelegatorCycle},
    operation::Operation,
    protocol::Protocol,
    rollup::RefutationGame,
    state::AppState,
    voting::{Proposal, ProposalHash, VotingPeriod},
};
use self::{column_families::ColumnFamilyHelpers, fixed_keys::FixedKeys};
use log::trace;
use speedb::{ColumnFamilyDescriptor, DBCompressionType, WriteBatch, DB};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct IndexerStore {
    pub db_path: PathBuf,
    pub database: DB,
}

impl IndexerStore {
    /// Add the corresponding CF helper to [ColumnFamilyHelpers] as needed!
    const COLUMN_FAMILIES: [&'static str; 18] = [
        // accounts
        "accounts",
        "delegates",
        "delegators",
        // blocks & operations
        "blocks",
        "operations",
        // protocols
        "protocols",
        // governance
        "proposals",
        "voting-periods",
        // rollups
        "refutation-games",
        "refutation-games-key",
        // cycles & rights
        "cycles",
        "baking-rights",
        "baker-cycles",
        "delegator-cycles",
        // contract storage
        "bigmap-keys",
        "bigmap-updates",
        "ticket-balances",
        "ticket-transfers",
    ];

    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let mut cf_opts = speedb::Options::default();
        cf_opts.set_max_write_buffer_number(16);
        cf_opts.set_compression_type(DBCompressionType::Zstd);

        let mut database_opts = speedb::Options::default();
        database_opts.set_compression_type(DBCompressionType::Zstd);
        database_opts.create_missing_column_families(true);
        database_opts.create_if_missing(true);

        let column_families: Vec<ColumnFamilyDescriptor> = Self::COLUMN_FAMILIES
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, cf_opts.clone()))
            .collect();

        Ok(Self {
            db_path: path.into(),
            database: speedb::DBWithThreadMode::open_cf_descriptors(
                &database_opts,
                path,
                column_families,
            )?,
        })
    }
}

impl FixedKeys for IndexerStore {}

//////////////////
// store update //
//////////////////

/// All effects of one block's apply or revert, written in a single batch so
/// a block's effects are durable all-or-nothing.
#[derive(Debug, Default)]
pub struct StoreUpdate {
    pub accounts: Vec<Account>,
    pub deleted_accounts: Vec<Address>,
    pub delegates_added: Vec<Address>,
    pub delegates_removed: Vec<Address>,
    /// (delegate, delegator) index rows
    pub delegators_added: Vec<(Address, Address)>,
    pub delegators_removed: Vec<(Address, Address)>,
    pub operations: Vec<Operation>,
    pub deleted_operations: Vec<(Level, u64)>,
    pub blocks: Vec<Block>,
    pub deleted_blocks: Vec<Level>,
    pub protocols: Vec<Protocol>,
    pub deleted_protocols: Vec<u32>,
    pub proposals: Vec<Proposal>,
    pub deleted_proposals: Vec<ProposalHash>,
    pub periods: Vec<VotingPeriod>,
    pub deleted_periods: Vec<u32>,
    pub games: Vec<RefutationGame>,
    pub deleted_games: Vec<RefutationGame>,
    pub cycles: Vec<Cycle>,
    pub deleted_cycles: Vec<u32>,
    pub baking_rights: Vec<BakingRight>,
    pub deleted_baking_rights: Vec<BakingRight>,
    pub baker_cycles: Vec<BakerCycle>,
    pub deleted_baker_cycles: Vec<(u32, Address)>,
    pub delegator_cycles: Vec<DelegatorCycle>,
    pub deleted_delegator_cycles: Vec<(u32, Address)>,
    /// absolute value puts; `None` deletes the key
    pub bigmap_values: Vec<(u64, String, Option<String>)>,
    pub bigmap_updates: Vec<BigMapUpdate>,
    pub deleted_bigmap_updates: Vec<(Level, u32)>,
    /// absolute balance puts; zero deletes the row
    pub ticket_balances: Vec<(Address, Address, i64)>,
    pub ticket_transfers: Vec<TicketTransfer>,
    pub deleted_ticket_transfers: Vec<(Level, u32)>,
    pub state: Option<AppState>,
}

impl IndexerStore {
    /// Persist one block's worth of effects atomically
    pub fn commit_update(&self, update: StoreUpdate) -> anyhow::Result<()> {
        let mut batch = WriteBatch::default();

        for account in &update.accounts {
            batch.put_cf(
                self.accounts_cf(),
                account.address.to_bytes(),
                serde_json::to_vec(account)?,
            );
        }
        for addr in &update.deleted_accounts {
            batch.delete_cf(self.accounts_cf(), addr.to_bytes());
        }
        for addr in &update.delegates_added {
            batch.put_cf(self.delegates_cf(), addr.to_bytes(), []);
        }
        for addr in &update.delegates_removed {
            batch.delete_cf(self.delegates_cf(), addr.to_bytes());
        }
        for (delegate, delegator) in &update.delegators_added {
            batch.put_cf(self.delegators_cf(), delegator_key(delegate, delegator), []);
        }
        for (delegate, delegator) in &update.delegators_removed {
            batch.delete_cf(self.delegators_cf(), delegator_key(delegate, delegator));
        }

        for op in &update.operations {
            batch.put_cf(
                self.operations_cf(),
                operation_key(op.level, op.id),
                serde_json::to_vec(op)?,
            );
        }
        for (level, id) in &update.deleted_operations {
            batch.delete_cf(self.operations_cf(), operation_key(*level, *id));
        }

        for block in &update.blocks {
            batch.put_cf(
                self.blocks_cf(),
                to_be_bytes(block.level),
                serde_json::to_vec(block)?,
            );
        }
        for level in &update.deleted_blocks {
            batch.delete_cf(self.blocks_cf(), to_be_bytes(*level));
        }

        for protocol in &update.protocols {
            batch.put_cf(
                self.protocols_cf(),
                to_be_bytes(protocol.version),
                serde_json::to_vec(protocol)?,
            );
        }
        for version in &update.deleted_protocols {
            batch.delete_cf(self.protocols_cf(), to_be_bytes(*version));
        }

        for proposal in &update.proposals {
            batch.put_cf(
                self.proposals_cf(),
                proposal.hash.0.as_bytes(),
                serde_json::to_vec(proposal)?,
            );
        }
        for hash in &update.deleted_proposals {
            batch.delete_cf(self.proposals_cf(), hash.0.as_bytes());
        }

        for period in &update.periods {
            batch.put_cf(
                self.voting_periods_cf(),
                to_be_bytes(period.index),
                serde_json::to_vec(period)?,
            );
        }
        for index in &update.deleted_periods {
            batch.delete_cf(self.voting_periods_cf(), to_be_bytes(*index));
        }

        for game in &update.games {
            batch.put_cf(
                self.refutation_games_cf(),
                u64_to_be_bytes(game.id),
                serde_json::to_vec(game)?,
            );
            // the symmetric index only resolves ongoing games
            if game.result.is_none() {
                batch.put_cf(
                    self.refutation_games_key_cf(),
                    game.key().to_bytes(),
                    u64_to_be_bytes(game.id),
                );
            } else {
                batch.delete_cf(self.refutation_games_key_cf(), game.key().to_bytes());
            }
        }
        for game in &update.deleted_games {
            batch.delete_cf(self.refutation_games_cf(), u64_to_be_bytes(game.id));
            batch.delete_cf(self.refutation_games_key_cf(), game.key().to_bytes());
        }

        for cycle in &update.cycles {
            batch.put_cf(
                self.cycles_cf(),
                to_be_bytes(cycle.index),
                serde_json::to_vec(cycle)?,
            );
        }
        for index in &update.deleted_cycles {
            batch.delete_cf(self.cycles_cf(), to_be_bytes(*index));
        }

        for right in &update.baking_rights {
            batch.put_cf(
                self.baking_rights_cf(),
                baking_right_key(right.cycle, right.level, right.round),
                right.baker.to_bytes(),
            );
        }
        for right in &update.deleted_baking_rights {
            batch.delete_cf(
                self.baking_rights_cf(),
                baking_right_key(right.cycle, right.level, right.round),
            );
        }

        for bc in &update.baker_cycles {
            batch.put_cf(
                self.baker_cycles_cf(),
                cycle_addr_key(bc.cycle, &bc.baker),
                serde_json::to_vec(bc)?,
            );
        }
        for (cycle, baker) in &update.deleted_baker_cycles {
            batch.delete_cf(self.baker_cycles_cf(), cycle_addr_key(*cycle, baker));
        }

        for dc in &update.delegator_cycles {
            batch.put_cf(
                self.delegator_cycles_cf(),
                cycle_addr_key(dc.cycle, &dc.delegator),
                serde_json::to_vec(dc)?,
            );
        }
        for (cycle, delegator) in &update.deleted_delegator_cycles {
            batch.delete_cf(self.delegator_cycles_cf(), cycle_addr_key(*cycle, delegator));
        }

        for (bigmap, key, value) in &update.bigmap_values {
            match value {
                Some(value) => batch.put_cf(
                    self.bigmap_keys_cf(),
                    bigmap_key(*bigmap, key),
                    value.as_bytes(),
                ),
                None => batch.delete_cf(self.bigmap_keys_cf(), bigmap_key(*bigmap, key)),
            }
        }
        for record in &update.bigmap_updates {
            batch.put_cf(
                self.bigmap_updates_cf(),
                level_index_key(record.level, record.index),
                serde_json::to_vec(record)?,
            );
        }
        for (level, index) in &update.deleted_bigmap_updates {
            batch.delete_cf(self.bigmap_updates_cf(), level_index_key(*level, *index));
        }

        for (ticketer, account, balance) in &update.ticket_balances {
            let key = ticket_balance_key(ticketer, account);
            if *balance == 0 {
                batch.delete_cf(self.ticket_balances_cf(), key);
            } else {
                batch.put_cf(self.ticket_balances_cf(), key, balance.to_be_bytes());
            }
        }
        for transfer in &update.ticket_transfers {
            batch.put_cf(
                self.ticket_transfers_cf(),
                level_index_key(transfer.level, transfer.index),
                serde_json::to_vec(transfer)?,
            );
        }
        for (level, index) in &update.deleted_ticket_transfers {
            batch.delete_cf(self.ticket_transfers_cf(), level_index_key(*level, *index));
        }

        if let Some(state) = &update.state {
            batch.put(Self::APP_STATE_KEY, serde_json::to_vec(state)?);
        }

        trace!("writing block batch ({} bytes)", batch.size_in_bytes());
        self.database.write(batch)?;
        Ok(())
    }
}

//////////
// keys //
//////////

pub fn to_be_bytes(value: u32) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn from_be_bytes(bytes: Vec<u8>) -> u32 {
    const SIZE: usize = (u32::BITS / 8) as usize;
    let mut be_bytes = [0; SIZE];

    be_bytes[..SIZE].copy_from_slice(&bytes[..SIZE]);
    u32::from_be_bytes(be_bytes)
}

pub fn u64_to_be_bytes(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// `{level BE32}{id BE64}` so one level is a single prefix scan in id order
pub fn operation_key(level: Level, id: u64) -> Vec<u8> {
    let mut bytes = to_be_bytes(level);
    bytes.append(&mut u64_to_be_bytes(id));
    bytes
}

pub fn baking_right_key(cycle: u32, level: Level, round: u32) -> Vec<u8> {
    let mut bytes = to_be_bytes(cycle);
    bytes.append(&mut to_be_bytes(level));
    bytes.append(&mut to_be_bytes(round));
    bytes
}

pub fn cycle_addr_key(cycle: u32, addr: &Address) -> Vec<u8> {
    let mut bytes = to_be_bytes(cycle);
    bytes.append(&mut addr.to_bytes());
    bytes
}

pub fn delegator_key(delegate: &Address, delegator: &Address) -> Vec<u8> {
    let mut bytes = delegate.to_bytes();
    bytes.append(&mut delegator.to_bytes());
    bytes
}

pub fn bigmap_key(bigmap: u64, key: &str) -> Vec<u8> {
    let mut bytes = u64_to_be_bytes(bigmap);
    bytes.append(&mut key.as_bytes().to_vec());
    bytes
}

pub fn level_index_key(level: Level, index: u32) -> Vec<u8> {
    let mut bytes = to_be_bytes(level);
    bytes.append(&mut to_be_bytes(index));
    bytes
}

pub fn ticket_balance_key(ticketer: &Address, account: &Address) -> Vec<u8> {
    let mut bytes = ticketer.to_bytes();
    bytes.append(&mut account.to_bytes());
    bytes
}
