//! Chain cursor: indexing progress and the operation-id allocator

pub mod store;

use crate::base::Level;
use serde::{Deserialize, Serialize};

/// Singleton record of indexing progress.
///
/// Operation ids are allocated strictly monotonically. On revert every
/// consumer must release exactly one id per operation record, in reverse
/// order of allocation: a whole-block LIFO contract, which makes the
/// allocator counter return to its exact pre-block value.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct AppState {
    pub level: Level,
    pub hash: String,
    pub timestamp: i64,
    pub protocol_version: u32,
    pub voting_period: u32,
    pub next_operation_id: u64,
    pub blocks_count: u32,
    pub operations_count: u64,
    pub migrations_count: u32,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            level: 0,
            hash: String::new(),
            timestamp: 0,
            protocol_version: 0,
            voting_period: 0,
            next_operation_id: 0,
            blocks_count: 0,
            operations_count: 0,
            migrations_count: 0,
        }
    }
}

impl AppState {
    pub fn next_operation_id(&mut self) -> u64 {
        let id = self.next_operation_id;
        self.next_operation_id += 1;
        self.operations_count += 1;
        id
    }

    pub fn release_operation_id(&mut self) {
        self.next_operation_id -= 1;
        self.operations_count -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::AppState;
    use quickcheck_macros::quickcheck;

    #[test]
    fn allocation_is_monotonic() {
        let mut state = AppState {
            next_operation_id: 10,
            ..AppState::default()
        };

        assert_eq!(10, state.next_operation_id());
        assert_eq!(11, state.next_operation_id());
        assert_eq!(12, state.next_operation_id());

        // reverting the block releases LIFO, one per allocation
        state.release_operation_id();
        state.release_operation_id();
        state.release_operation_id();

        assert_eq!(10, state.next_operation_id());
    }

    #[quickcheck]
    fn release_restores_allocator(allocs: u8) -> bool {
        let mut state = AppState {
            next_operation_id: 1000,
            operations_count: 1000,
            ..AppState::default()
        };

        for _ in 0..allocs {
            state.next_operation_id();
        }
        for _ in 0..allocs {
            state.release_operation_id();
        }

        state.next_operation_id == 1000 && state.operations_count == 1000
    }
}
