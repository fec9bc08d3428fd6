//! Small chain-level value types shared across the indexer

pub mod address;
pub mod amount;
pub mod op_hash;

/// Block height from genesis
pub type Level = u32;
