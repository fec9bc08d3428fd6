//! Block-lifetime identity cache
//!
//! Every commit in a block resolves entities through the same
//! [BlockContext], so two commits touching the same account observe each
//! other's writes. The context lives exactly one block: apply or revert
//! builds one, runs every commit against it, then drains it into a single
//! [StoreUpdate].

use crate::{
    account::Account,
    base::{address::Address, amount::Amount, Level},
    cycle::BakerCycle,
    error::IndexerError,
    protocol::Protocol,
    rollup::{GameKey, RefutationGame},
    state::{store::StateStore, AppState},
    store::{IndexerStore, StoreUpdate},
    voting::{Proposal, ProposalHash, VotingPeriod},
};
use crate::{
    account::store::AccountStore, cycle::store::CycleStore, protocol::store::ProtocolStore,
    rollup::store::RollupStore, voting::store::VotingStore,
};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct BlockCache {
    accounts: HashMap<Address, Account>,
    removed_accounts: HashSet<Address>,
    protocols: HashMap<u32, Protocol>,
    removed_protocols: HashSet<u32>,
    proposals: HashMap<ProposalHash, Proposal>,
    removed_proposals: HashSet<ProposalHash>,
    periods: HashMap<u32, VotingPeriod>,
    removed_periods: HashSet<u32>,
    games: HashMap<u64, RefutationGame>,
    removed_games: HashMap<u64, RefutationGame>,
    baker_cycles: HashMap<(u32, Address), BakerCycle>,
    removed_baker_cycles: HashSet<(u32, Address)>,
}

#[derive(Debug)]
pub struct BlockContext<'a> {
    pub store: &'a IndexerStore,
    pub state: AppState,
    /// rows with no identity requirement are pushed here directly
    pub update: StoreUpdate,
    cache: BlockCache,
    /// pre-operation last-activity levels, drained into the next pushed
    /// operation record
    activity: Vec<(Address, Level)>,
}

impl<'a> BlockContext<'a> {
    pub fn new(store: &'a IndexerStore) -> anyhow::Result<Self> {
        let state = store.get_app_state()?.unwrap_or_default();
        Ok(Self {
            store,
            state,
            update: StoreUpdate::default(),
            cache: BlockCache::default(),
            activity: vec![],
        })
    }

    /// Remember the last-activity level `addr` had before the operation
    /// currently applying
    pub fn note_activity(&mut self, addr: &Address, prev: Level) {
        self.activity.push((addr.clone(), prev));
    }

    /// Hand the noted levels to the operation record being pushed
    pub fn take_activity(&mut self) -> Vec<(Address, Level)> {
        std::mem::take(&mut self.activity)
    }

    //////////////
    // accounts //
    //////////////

    pub fn try_account(&mut self, addr: &Address) -> anyhow::Result<Option<Account>> {
        if self.cache.removed_accounts.contains(addr) {
            return Ok(None);
        }
        if let Some(account) = self.cache.accounts.get(addr) {
            return Ok(Some(account.clone()));
        }
        match self.store.get_account(addr)? {
            Some(account) => {
                self.cache.accounts.insert(addr.clone(), account.clone());
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    pub fn account(&mut self, addr: &Address) -> anyhow::Result<Account> {
        self.try_account(addr)?
            .ok_or_else(|| IndexerError::referential(format!("missing account {addr}")))
    }

    /// Resolve an account, creating a bare user account on first reference
    pub fn account_or_create(&mut self, addr: &Address, level: Level) -> anyhow::Result<Account> {
        match self.try_account(addr)? {
            Some(account) => Ok(account),
            None => {
                let account = Account::new_user(addr.clone(), level);
                self.put_account(account.clone());
                Ok(account)
            }
        }
    }

    pub fn put_account(&mut self, account: Account) {
        self.cache.removed_accounts.remove(&account.address);
        self.cache.accounts.insert(account.address.clone(), account);
    }

    pub fn update_account<F>(&mut self, addr: &Address, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Account),
    {
        let mut account = self.account(addr)?;
        f(&mut account);
        self.put_account(account);
        Ok(())
    }

    pub fn remove_account(&mut self, addr: &Address) {
        self.cache.accounts.remove(addr);
        self.cache.removed_accounts.insert(addr.clone());
    }

    ///////////////
    // protocols //
    ///////////////

    pub fn try_protocol(&mut self, version: u32) -> anyhow::Result<Option<Protocol>> {
        if self.cache.removed_protocols.contains(&version) {
            return Ok(None);
        }
        if let Some(protocol) = self.cache.protocols.get(&version) {
            return Ok(Some(protocol.clone()));
        }
        match self.store.get_protocol(version)? {
            Some(protocol) => {
                self.cache.protocols.insert(version, protocol.clone());
                Ok(Some(protocol))
            }
            None => Ok(None),
        }
    }

    pub fn protocol(&mut self, version: u32) -> anyhow::Result<Protocol> {
        self.try_protocol(version)?
            .ok_or_else(|| IndexerError::referential(format!("missing protocol v{version}")))
    }

    pub fn put_protocol(&mut self, protocol: Protocol) {
        self.cache.removed_protocols.remove(&protocol.version);
        self.cache.protocols.insert(protocol.version, protocol);
    }

    pub fn update_protocol<F>(&mut self, version: u32, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut Protocol),
    {
        let mut protocol = self.protocol(version)?;
        f(&mut protocol);
        self.put_protocol(protocol);
        Ok(())
    }

    pub fn remove_protocol(&mut self, version: u32) {
        self.cache.protocols.remove(&version);
        self.cache.removed_protocols.insert(version);
    }

    ////////////////
    // governance //
    ////////////////

    pub fn try_proposal(&mut self, hash: &ProposalHash) -> anyhow::Result<Option<Proposal>> {
        if self.cache.removed_proposals.contains(hash) {
            return Ok(None);
        }
        if let Some(proposal) = self.cache.proposals.get(hash) {
            return Ok(Some(proposal.clone()));
        }
        match self.store.get_proposal(hash)? {
            Some(proposal) => {
                self.cache.proposals.insert(hash.clone(), proposal.clone());
                Ok(Some(proposal))
            }
            None => Ok(None),
        }
    }

    pub fn proposal(&mut self, hash: &ProposalHash) -> anyhow::Result<Proposal> {
        self.try_proposal(hash)?
            .ok_or_else(|| IndexerError::referential(format!("missing proposal {}", hash.0)))
    }

    pub fn put_proposal(&mut self, proposal: Proposal) {
        self.cache.removed_proposals.remove(&proposal.hash);
        self.cache.proposals.insert(proposal.hash.clone(), proposal);
    }

    pub fn remove_proposal(&mut self, hash: &ProposalHash) {
        self.cache.proposals.remove(hash);
        self.cache.removed_proposals.insert(hash.clone());
    }

    pub fn try_period(&mut self, index: u32) -> anyhow::Result<Option<VotingPeriod>> {
        if self.cache.removed_periods.contains(&index) {
            return Ok(None);
        }
        if let Some(period) = self.cache.periods.get(&index) {
            return Ok(Some(period.clone()));
        }
        match self.store.get_voting_period(index)? {
            Some(period) => {
                self.cache.periods.insert(index, period.clone());
                Ok(Some(period))
            }
            None => Ok(None),
        }
    }

    pub fn period(&mut self, index: u32) -> anyhow::Result<VotingPeriod> {
        self.try_period(index)?
            .ok_or_else(|| IndexerError::referential(format!("missing voting period {index}")))
    }

    pub fn put_period(&mut self, period: VotingPeriod) {
        self.cache.removed_periods.remove(&period.index);
        self.cache.periods.insert(period.index, period);
    }

    pub fn update_period<F>(&mut self, index: u32, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut VotingPeriod),
    {
        let mut period = self.period(index)?;
        f(&mut period);
        self.put_period(period);
        Ok(())
    }

    pub fn remove_period(&mut self, index: u32) {
        self.cache.periods.remove(&index);
        self.cache.removed_periods.insert(index);
    }

    ///////////
    // games //
    ///////////

    pub fn game(&mut self, id: u64) -> anyhow::Result<RefutationGame> {
        if let Some(game) = self.cache.games.get(&id) {
            return Ok(game.clone());
        }
        if self.cache.removed_games.contains_key(&id) {
            return Err(IndexerError::referential(format!("missing game {id}")));
        }
        match self.store.get_game(id)? {
            Some(game) => {
                self.cache.games.insert(id, game.clone());
                Ok(game)
            }
            None => Err(IndexerError::referential(format!("missing game {id}"))),
        }
    }

    /// Look up the ongoing game between two stakers on a rollup, if any
    pub fn game_by_key(&mut self, key: &GameKey) -> anyhow::Result<Option<u64>> {
        for game in self.cache.games.values() {
            if game.result.is_none() && game.key() == *key {
                return Ok(Some(game.id));
            }
        }
        match self.store.get_game_id(key)? {
            Some(id) => {
                if self.cache.removed_games.contains_key(&id) {
                    return Ok(None);
                }
                // a settled game staged in this block no longer resolves
                if self.cache.games.get(&id).is_some_and(|g| g.result.is_some()) {
                    return Ok(None);
                }
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    pub fn put_game(&mut self, game: RefutationGame) {
        self.cache.removed_games.remove(&game.id);
        self.cache.games.insert(game.id, game);
    }

    pub fn update_game<F>(&mut self, id: u64, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut RefutationGame),
    {
        let mut game = self.game(id)?;
        f(&mut game);
        self.put_game(game);
        Ok(())
    }

    pub fn remove_game(&mut self, id: u64) -> anyhow::Result<()> {
        let game = self.game(id)?;
        self.cache.games.remove(&id);
        self.cache.removed_games.insert(id, game);
        Ok(())
    }

    //////////////////
    // baker cycles //
    //////////////////

    pub fn try_baker_cycle(
        &mut self,
        cycle: u32,
        baker: &Address,
    ) -> anyhow::Result<Option<BakerCycle>> {
        let key = (cycle, baker.clone());
        if self.cache.removed_baker_cycles.contains(&key) {
            return Ok(None);
        }
        if let Some(row) = self.cache.baker_cycles.get(&key) {
            return Ok(Some(row.clone()));
        }
        match self.store.get_baker_cycle(cycle, baker)? {
            Some(row) => {
                self.cache.baker_cycles.insert(key, row.clone());
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// Bakers without rights can still earn in a cycle (fees, revelation
    /// rewards), so a row is created on first touch.
    pub fn baker_cycle_or_create(
        &mut self,
        cycle: u32,
        baker: &Address,
    ) -> anyhow::Result<BakerCycle> {
        match self.try_baker_cycle(cycle, baker)? {
            Some(row) => Ok(row),
            None => {
                let row = BakerCycle::new(cycle, baker.clone(), Default::default());
                self.put_baker_cycle(row.clone());
                Ok(row)
            }
        }
    }

    pub fn put_baker_cycle(&mut self, row: BakerCycle) {
        let key = (row.cycle, row.baker.clone());
        self.cache.removed_baker_cycles.remove(&key);
        self.cache.baker_cycles.insert(key, row);
    }

    pub fn update_baker_cycle<F>(&mut self, cycle: u32, baker: &Address, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut BakerCycle),
    {
        let mut row = self.baker_cycle_or_create(cycle, baker)?;
        f(&mut row);
        // a row back at the on-demand initial state is indistinguishable
        // from an absent one, so the revert must not leave it behind
        if row == BakerCycle::new(cycle, baker.clone(), Amount::default()) {
            self.remove_baker_cycle(cycle, baker);
        } else {
            self.put_baker_cycle(row);
        }
        Ok(())
    }

    pub fn remove_baker_cycle(&mut self, cycle: u32, baker: &Address) {
        let key = (cycle, baker.clone());
        self.cache.baker_cycles.remove(&key);
        self.cache.removed_baker_cycles.insert(key);
    }

    ///////////
    // flush //
    ///////////

    /// Drain every touched entity into the batch. The cache is consumed:
    /// the next block builds a fresh context and observes only what the
    /// batch made durable.
    pub fn into_update(mut self) -> StoreUpdate {
        let mut update = self.update;

        update.accounts.extend(self.cache.accounts.into_values());
        update
            .deleted_accounts
            .extend(self.cache.removed_accounts.drain());
        update.protocols.extend(self.cache.protocols.into_values());
        update
            .deleted_protocols
            .extend(self.cache.removed_protocols.drain());
        update.proposals.extend(self.cache.proposals.into_values());
        update
            .deleted_proposals
            .extend(self.cache.removed_proposals.drain());
        update.periods.extend(self.cache.periods.into_values());
        update
            .deleted_periods
            .extend(self.cache.removed_periods.drain());
        update.games.extend(self.cache.games.into_values());
        update
            .deleted_games
            .extend(self.cache.removed_games.into_values());
        update
            .baker_cycles
            .extend(self.cache.baker_cycles.into_values());
        update
            .deleted_baker_cycles
            .extend(self.cache.removed_baker_cycles.drain());
        update.state = Some(self.state);

        update
    }
}

#[cfg(test)]
mod tests {
    use super::BlockContext;
    use crate::{
        base::{address::Address, amount::Amount},
        store::IndexerStore,
    };
    use tempfile::TempDir;

    #[test]
    fn commits_share_one_identity() -> anyhow::Result<()> {
        let tmp = TempDir::with_prefix("identity_cache")?;
        let store = IndexerStore::new(tmp.path())?;
        let mut ctx = BlockContext::new(&store)?;

        let addr = Address::new("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb");
        ctx.account_or_create(&addr, 1)?;
        ctx.update_account(&addr, |a| a.balance += Amount::new(5))?;

        // a later commit in the same block sees the earlier write
        let account = ctx.account(&addr)?;
        assert_eq!(Amount::new(5), account.balance);
        Ok(())
    }

    #[test]
    fn removal_hides_account_for_rest_of_block() -> anyhow::Result<()> {
        let tmp = TempDir::with_prefix("identity_cache_removal")?;
        let store = IndexerStore::new(tmp.path())?;
        let mut ctx = BlockContext::new(&store)?;

        let addr = Address::new("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb");
        ctx.account_or_create(&addr, 1)?;
        ctx.remove_account(&addr);

        assert!(ctx.try_account(&addr)?.is_none());
        Ok(())
    }
}
