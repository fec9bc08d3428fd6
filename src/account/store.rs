use super::Account;
use crate::base::address::Address;

pub trait AccountStore {
    fn get_account(&self, addr: &Address) -> anyhow::Result<Option<Account>>;

    /// All registered delegates, active or not
    fn get_delegates(&self) -> anyhow::Result<Vec<Address>>;

    /// Accounts currently delegating to `delegate`
    fn get_delegators(&self, delegate: &Address) -> anyhow::Result<Vec<Address>>;
}
