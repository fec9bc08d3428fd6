//! Indexer amount type (mutez)

use crate::constants::MUTEZ_SCALE;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub, SubAssign};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default, Hash)]
pub struct Amount(pub u64);

//////////
// impl //
//////////

impl Amount {
    /// Whole-token amount
    pub fn new(amount: u64) -> Self {
        Self(amount * MUTEZ_SCALE)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Signed delta applied on top of this amount.
    /// Used by migration records which store a signed balance change.
    pub fn apply_delta(&self, delta: i64) -> Self {
        let abs = delta.unsigned_abs();
        if delta < 0 {
            Self(self.0 - abs)
        } else {
            Self(self.0 + abs)
        }
    }
}

////////////////
// operations //
////////////////

impl Add<Amount> for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub<Amount> for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign<Amount> for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = Self(self.0 + rhs.0)
    }
}

impl SubAssign<Amount> for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        *self = Self(self.0 - rhs.0)
    }
}

/////////////////
// conversions //
/////////////////

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::str::FromStr for Amount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| anyhow!("invalid amount '{s}': {e}"))
    }
}

///////////
// serde //
///////////

// The node RPC encodes mutez amounts as decimal strings

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>().map(Self).map_err(serde::de::Error::custom)
    }
}

/////////////
// display //
/////////////

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", mutez_to_tez(self.0))
    }
}

pub fn mutez_to_tez(num: u64) -> String {
    let whole = num / MUTEZ_SCALE;
    let frac = num % MUTEZ_SCALE;
    if frac == 0 {
        return whole.to_string();
    }
    let mut s = format!("{whole}.{frac:06}");
    while s.ends_with('0') {
        s.pop();
    }
    s
}

#[cfg(test)]
impl quickcheck::Arbitrary for Amount {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        u64::arbitrary(g).into()
    }
}

#[cfg(test)]
mod tests {
    use super::{mutez_to_tez, Amount};

    #[test]
    fn roundtrip() -> anyhow::Result<()> {
        let amt = Amount::new(42);

        let ser = serde_json::to_vec(&amt)?;
        let res: Amount = serde_json::from_slice(&ser)?;

        assert_eq!(amt, res);
        Ok(())
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!("1.000001", mutez_to_tez(1_000_001));
        assert_eq!("1", mutez_to_tez(1_000_000));
        assert_eq!("0.5", mutez_to_tez(500_000));
    }
}
