use super::Operation;
use crate::base::Level;

pub trait OperationStore {
    /// All operations committed at `level`, ascending by id
    fn get_operations_at(&self, level: Level) -> anyhow::Result<Vec<Operation>>;
}
