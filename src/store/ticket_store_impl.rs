use super::{column_families::ColumnFamilyHelpers, ticket_balance_key, to_be_bytes, IndexerStore};
use crate::{
    base::{address::Address, Level},
    commit::tickets::{TicketStore, TicketTransfer},
};
use log::trace;
use speedb::{Direction, IteratorMode};

impl TicketStore for IndexerStore {
    fn get_ticket_balance(&self, ticketer: &Address, account: &Address) -> anyhow::Result<i64> {
        trace!("getting ticket balance {ticketer} {account}");
        Ok(self
            .database
            .get_cf(self.ticket_balances_cf(), ticket_balance_key(ticketer, account))?
            .map(|bytes| {
                let mut be_bytes = [0; 8];
                be_bytes.copy_from_slice(&bytes[..8]);
                i64::from_be_bytes(be_bytes)
            })
            .unwrap_or(0))
    }

    fn get_ticket_transfers_at(&self, level: Level) -> anyhow::Result<Vec<TicketTransfer>> {
        trace!("getting ticket transfers at {level}");
        let prefix = to_be_bytes(level);
        let mut transfers = vec![];
        for item in self.database.iterator_cf(
            self.ticket_transfers_cf(),
            IteratorMode::From(&prefix, Direction::Forward),
        ) {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            transfers.push(serde_json::from_slice(&value)?);
        }
        Ok(transfers)
    }
}
