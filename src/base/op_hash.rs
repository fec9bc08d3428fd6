//! Operation group hash

use crate::constants::OP_HASH_LEN;
use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Default, Hash, Serialize, Deserialize)]
pub struct OpHash(pub String);

impl OpHash {
    pub const LEN: usize = OP_HASH_LEN;

    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }
}

pub fn is_valid_op_hash(input: &str) -> bool {
    input.len() == OP_HASH_LEN && input.starts_with('o')
}

impl std::str::FromStr for OpHash {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid_op_hash(s) {
            Ok(Self(s.to_string()))
        } else {
            bail!("Invalid operation hash: {s}")
        }
    }
}

impl std::fmt::Display for OpHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
