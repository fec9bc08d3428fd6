use super::{column_families::ColumnFamilyHelpers, to_be_bytes, IndexerStore};
use crate::{
    base::Level,
    operation::{store::OperationStore, Operation},
};
use log::trace;
use speedb::{Direction, IteratorMode};

impl OperationStore for IndexerStore {
    fn get_operations_at(&self, level: Level) -> anyhow::Result<Vec<Operation>> {
        trace!("getting operations at {level}");
        let prefix = to_be_bytes(level);
        let mut operations = vec![];
        for item in self.database.iterator_cf(
            self.operations_cf(),
            IteratorMode::From(&prefix, Direction::Forward),
        ) {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            operations.push(serde_json::from_slice(&value)?);
        }
        Ok(operations)
    }
}
