//! Smart rollup refutation games
//!
//! A refutation game is a dispute session between two accounts over a rollup
//! commitment. It is looked up by `(rollup, participant, participant)` with
//! the two participants in either order.

pub mod store;

use crate::base::{address::Address, Level};
use serde::{Deserialize, Serialize};

/// Order-independent lookup key
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize, Deserialize)]
pub struct GameKey {
    pub rollup: Address,
    lo: Address,
    hi: Address,
}

impl GameKey {
    pub fn new(rollup: Address, a: Address, b: Address) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self { rollup, lo, hi }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.rollup.to_bytes();
        bytes.append(&mut self.lo.to_bytes());
        bytes.append(&mut self.hi.to_bytes());
        bytes
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum GameResult {
    InitiatorWon,
    OpponentWon,
    Draw,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RefutationGame {
    pub id: u64,
    pub rollup: Address,
    pub initiator: Address,
    pub opponent: Address,
    pub commitment: String,
    pub first_level: Level,
    pub last_level: Level,
    pub moves: u32,
    pub result: Option<GameResult>,
}

impl RefutationGame {
    pub fn key(&self) -> GameKey {
        GameKey::new(
            self.rollup.clone(),
            self.initiator.clone(),
            self.opponent.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::GameKey;
    use crate::base::address::Address;

    #[test]
    fn key_is_symmetric() {
        let rollup = Address::new("sr1Ghq66tYK9y3r8CC1Tf8i8m5nxh8nTvZEf");
        let a = Address::new("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb");
        let b = Address::new("tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx");

        assert_eq!(
            GameKey::new(rollup.clone(), a.clone(), b.clone()),
            GameKey::new(rollup, b, a)
        );
    }
}
