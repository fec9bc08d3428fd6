use super::{column_families::ColumnFamilyHelpers, to_be_bytes, IndexerStore};
use crate::{
    base::Level,
    block::{store::BlockStore, Block},
};
use log::trace;

impl BlockStore for IndexerStore {
    fn get_block(&self, level: Level) -> anyhow::Result<Option<Block>> {
        trace!("getting block at {level}");
        Ok(self
            .database
            .get_cf(self.blocks_cf(), to_be_bytes(level))?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }
}
