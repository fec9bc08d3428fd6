use super::{column_families::ColumnFamilyHelpers, IndexerStore};
use crate::{
    account::{store::AccountStore, Account},
    base::address::Address,
};
use log::trace;
use speedb::{Direction, IteratorMode};

impl AccountStore for IndexerStore {
    fn get_account(&self, addr: &Address) -> anyhow::Result<Option<Account>> {
        trace!("getting account {addr}");
        Ok(self
            .database
            .get_cf(self.accounts_cf(), addr.to_bytes())?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }

    fn get_delegates(&self) -> anyhow::Result<Vec<Address>> {
        trace!("getting delegates");
        let mut delegates = vec![];
        for item in self
            .database
            .iterator_cf(self.delegates_cf(), IteratorMode::Start)
        {
            let (key, _) = item?;
            delegates.push(Address::from_bytes(&key)?);
        }
        Ok(delegates)
    }

    fn get_delegators(&self, delegate: &Address) -> anyhow::Result<Vec<Address>> {
        trace!("getting delegators of {delegate}");
        let prefix = delegate.to_bytes();
        let mut delegators = vec![];
        for item in self.database.iterator_cf(
            self.delegators_cf(),
            IteratorMode::From(&prefix, Direction::Forward),
        ) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            delegators.push(Address::from_bytes(&key[prefix.len()..])?);
        }
        Ok(delegators)
    }
}
