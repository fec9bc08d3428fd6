//! Account address type
//!
//! Addresses are base58check strings with a 3-byte kind prefix:
//! `tz1`/`tz2`/`tz3` implicit accounts, `KT1` originated contracts,
//! `sr1` smart rollups.

use crate::constants::ADDRESS_LEN;
use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Default, Hash, Serialize)]
pub struct Address(pub String);

impl Address {
    pub const LEN: usize = ADDRESS_LEN;

    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn is_implicit(&self) -> bool {
        self.0.starts_with("tz")
    }

    pub fn is_contract(&self) -> bool {
        self.0.starts_with("KT1")
    }

    pub fn is_rollup(&self) -> bool {
        self.0.starts_with("sr1")
    }

    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(Self(String::from_utf8(bytes.to_vec())?))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

pub fn is_valid_address(input: &str) -> bool {
    let prefixed = input.starts_with("tz1")
        || input.starts_with("tz2")
        || input.starts_with("tz3")
        || input.starts_with("KT1")
        || input.starts_with("sr1");

    // 3-byte prefix + 20-byte payload under the base58 checksum
    prefixed
        && input.len() == ADDRESS_LEN
        && bs58::decode(input)
            .with_check(None)
            .into_vec()
            .map(|bytes| bytes.len() == 23)
            .unwrap_or(false)
}

impl std::str::FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid_address(s) {
            Ok(Self(s.to_string()))
        } else {
            bail!("Invalid address: {s}")
        }
    }
}

// Payloads reach the commits only through deserialization, so a malformed
// address is a decode fault before anything applies.
impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Address;

    #[test]
    fn prefixes() {
        assert!(Address::new("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb").is_implicit());
        assert!(Address::new("KT1BEqzn5Wx8uJrZNvuS9DVHmLvG9td3fDLi").is_contract());
        assert!(Address::new("sr1Ghq66tYK9y3r8CC1Tf8i8m5nxh8nTvZEf").is_rollup());
    }

    #[test]
    fn malformed_addresses_fail_to_decode() {
        // truncated, bad checksum, unknown prefix
        assert!(serde_json::from_str::<Address>("\"tz1short\"").is_err());
        assert!("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjc".parse::<Address>().is_err());
        assert!("bt1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb".parse::<Address>().is_err());
    }

    #[test]
    fn bytes_roundtrip() -> anyhow::Result<()> {
        let addr = Address::new("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb");
        assert_eq!(addr, Address::from_bytes(&addr.to_bytes())?);
        Ok(())
    }
}
