use super::{column_families::ColumnFamilyHelpers, u64_to_be_bytes, IndexerStore};
use crate::rollup::{store::RollupStore, GameKey, RefutationGame};
use log::trace;

impl RollupStore for IndexerStore {
    fn get_game(&self, id: u64) -> anyhow::Result<Option<RefutationGame>> {
        trace!("getting refutation game {id}");
        Ok(self
            .database
            .get_cf(self.refutation_games_cf(), u64_to_be_bytes(id))?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }

    fn get_game_id(&self, key: &GameKey) -> anyhow::Result<Option<u64>> {
        trace!("getting refutation game id on {}", key.rollup);
        Ok(self
            .database
            .get_cf(self.refutation_games_key_cf(), key.to_bytes())?
            .map(|bytes| {
                let mut be_bytes = [0; 8];
                be_bytes.copy_from_slice(&bytes[..8]);
                u64::from_be_bytes(be_bytes)
            }))
    }
}
