use super::{column_families::ColumnFamilyHelpers, IndexerStore};
use speedb::ColumnFamily;

impl ColumnFamilyHelpers for IndexerStore {
    fn accounts_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("accounts")
            .expect("accounts column family exists")
    }

    fn delegates_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("delegates")
            .expect("delegates column family exists")
    }

    fn delegators_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("delegators")
            .expect("delegators column family exists")
    }

    fn blocks_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("blocks")
            .expect("blocks column family exists")
    }

    fn operations_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("operations")
            .expect("operations column family exists")
    }

    fn protocols_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("protocols")
            .expect("protocols column family exists")
    }

    fn proposals_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("proposals")
            .expect("proposals column family exists")
    }

    fn voting_periods_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("voting-periods")
            .expect("voting-periods column family exists")
    }

    fn refutation_games_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("refutation-games")
            .expect("refutation-games column family exists")
    }

    fn refutation_games_key_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("refutation-games-key")
            .expect("refutation-games-key column family exists")
    }

    fn cycles_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("cycles")
            .expect("cycles column family exists")
    }

    fn baking_rights_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("baking-rights")
            .expect("baking-rights column family exists")
    }

    fn baker_cycles_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("baker-cycles")
            .expect("baker-cycles column family exists")
    }

    fn delegator_cycles_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("delegator-cycles")
            .expect("delegator-cycles column family exists")
    }

    fn bigmap_keys_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("bigmap-keys")
            .expect("bigmap-keys column family exists")
    }

    fn bigmap_updates_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("bigmap-updates")
            .expect("bigmap-updates column family exists")
    }

    fn ticket_balances_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("ticket-balances")
            .expect("ticket-balances column family exists")
    }

    fn ticket_transfers_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("ticket-transfers")
            .expect("ticket-transfers column family exists")
    }
}
