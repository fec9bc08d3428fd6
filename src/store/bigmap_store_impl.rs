use super::{bigmap_key, column_families::ColumnFamilyHelpers, to_be_bytes, IndexerStore};
use crate::{
    base::Level,
    commit::bigmap::{BigMapStore, BigMapUpdate},
};
use log::trace;
use speedb::{Direction, IteratorMode};

impl BigMapStore for IndexerStore {
    fn get_bigmap_value(&self, bigmap: u64, key: &str) -> anyhow::Result<Option<String>> {
        trace!("getting big map {bigmap} value");
        Ok(self
            .database
            .get_cf(self.bigmap_keys_cf(), bigmap_key(bigmap, key))?
            .map(|bytes| String::from_utf8(bytes))
            .transpose()?)
    }

    fn get_bigmap_updates_at(&self, level: Level) -> anyhow::Result<Vec<BigMapUpdate>> {
        trace!("getting big map updates at {level}");
        let prefix = to_be_bytes(level);
        let mut records = vec![];
        for item in self.database.iterator_cf(
            self.bigmap_updates_cf(),
            IteratorMode::From(&prefix, Direction::Forward),
        ) {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}
