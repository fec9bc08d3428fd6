use super::{baking_right_key, column_families::ColumnFamilyHelpers, to_be_bytes, IndexerStore};
use crate::{
    base::{address::Address, Level},
    cycle::{store::CycleStore, BakerCycle, BakingRight, Cycle, DelegatorCycle},
    store::cycle_addr_key,
};
use log::trace;
use speedb::{ColumnFamily, Direction, IteratorMode};

impl IndexerStore {
    /// Collect values under one cycle prefix
    fn cycle_prefix_scan<T: serde::de::DeserializeOwned>(
        &self,
        cf: &ColumnFamily,
        cycle: u32,
    ) -> anyhow::Result<Vec<T>> {
        let prefix = to_be_bytes(cycle);
        let mut rows = vec![];
        for item in self
            .database
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }
}

impl CycleStore for IndexerStore {
    fn get_cycle(&self, index: u32) -> anyhow::Result<Option<Cycle>> {
        trace!("getting cycle {index}");
        Ok(self
            .database
            .get_cf(self.cycles_cf(), to_be_bytes(index))?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }

    fn get_baking_right(
        &self,
        cycle: u32,
        level: Level,
        round: u32,
    ) -> anyhow::Result<Option<Address>> {
        trace!("getting baking right at {level} round {round}");
        Ok(self
            .database
            .get_cf(self.baking_rights_cf(), baking_right_key(cycle, level, round))?
            .map(|bytes| Address::from_bytes(&bytes))
            .transpose()?)
    }

    fn get_baking_rights(&self, cycle: u32) -> anyhow::Result<Vec<BakingRight>> {
        trace!("getting baking rights of cycle {cycle}");
        let prefix = to_be_bytes(cycle);
        let mut rights = vec![];
        for item in self.database.iterator_cf(
            self.baking_rights_cf(),
            IteratorMode::From(&prefix, Direction::Forward),
        ) {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            rights.push(BakingRight {
                cycle,
                level: super::from_be_bytes(key[4..8].to_vec()),
                round: super::from_be_bytes(key[8..12].to_vec()),
                baker: Address::from_bytes(&value)?,
            });
        }
        Ok(rights)
    }

    fn get_baker_cycle(&self, cycle: u32, baker: &Address) -> anyhow::Result<Option<BakerCycle>> {
        trace!("getting baker cycle {cycle} {baker}");
        Ok(self
            .database
            .get_cf(self.baker_cycles_cf(), cycle_addr_key(cycle, baker))?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }

    fn get_baker_cycles(&self, cycle: u32) -> anyhow::Result<Vec<BakerCycle>> {
        trace!("getting baker cycles of cycle {cycle}");
        self.cycle_prefix_scan(self.baker_cycles_cf(), cycle)
    }

    fn get_delegator_cycles(&self, cycle: u32) -> anyhow::Result<Vec<DelegatorCycle>> {
        trace!("getting delegator cycles of cycle {cycle}");
        self.cycle_prefix_scan(self.delegator_cycles_cf(), cycle)
    }
}
