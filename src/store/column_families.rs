use speedb::ColumnFamily;

/// One helper per column family in [IndexerStore::COLUMN_FAMILIES]
pub trait ColumnFamilyHelpers {
    /// CF for storing accounts by address
    fn accounts_cf(&self) -> &ColumnFamily;

    /// CF indexing registered delegates
    fn delegates_cf(&self) -> &ColumnFamily;

    /// CF indexing delegators per delegate
    fn delegators_cf(&self) -> &ColumnFamily;

    /// CF for storing blocks by level
    fn blocks_cf(&self) -> &ColumnFamily;

    /// CF for storing operations by `{level}{id}`
    fn operations_cf(&self) -> &ColumnFamily;

    /// CF for storing activated protocols by version
    fn protocols_cf(&self) -> &ColumnFamily;

    /// CF for storing governance proposals by hash
    fn proposals_cf(&self) -> &ColumnFamily;

    /// CF for storing voting periods by index
    fn voting_periods_cf(&self) -> &ColumnFamily;

    /// CF for storing refutation games by id
    fn refutation_games_cf(&self) -> &ColumnFamily;

    /// CF indexing ongoing refutation games by participant-symmetric key
    fn refutation_games_key_cf(&self) -> &ColumnFamily;

    /// CF for storing cycles by index
    fn cycles_cf(&self) -> &ColumnFamily;

    /// CF for storing baking rights by `{cycle}{level}{round}`
    fn baking_rights_cf(&self) -> &ColumnFamily;

    /// CF for storing per-cycle baker aggregates by `{cycle}{baker}`
    fn baker_cycles_cf(&self) -> &ColumnFamily;

    /// CF for storing per-cycle delegator snapshots by `{cycle}{delegator}`
    fn delegator_cycles_cf(&self) -> &ColumnFamily;

    /// CF for storing current big map values by `{bigmap}{key}`
    fn bigmap_keys_cf(&self) -> &ColumnFamily;

    /// CF for storing big map update records by `{level}{index}`
    fn bigmap_updates_cf(&self) -> &ColumnFamily;

    /// CF for storing ticket balances by `{ticketer}{account}`
    fn ticket_balances_cf(&self) -> &ColumnFamily;

    /// CF for storing ticket transfer records by `{level}{index}`
    fn ticket_transfers_cf(&self) -> &ColumnFamily;
}
