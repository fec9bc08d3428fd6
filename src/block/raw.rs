//! Raw node block payload
//!
//! The node delivers a block as four ordered operation batches (consensus,
//! governance, anomaly, manager); each batch entry carries one or more
//! tagged contents with a `kind` discriminant and kind-specific fields.
//! Transport framing beyond this shape is handled upstream; the indexer
//! assumes a fully-fetched, well-formed payload at entry.

use crate::{
    base::{address::Address, Level},
    error::IndexerError,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub level: Level,
    pub hash: String,
    #[serde(deserialize_with = "timestamp")]
    pub timestamp: i64,
    pub baker: Address,
    pub protocol: u32,
    /// consensus, governance, anomaly, manager
    pub operations: [Vec<RawOperationGroup>; 4],
}

/// Unix seconds, given either directly or as an RFC 3339 string
fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range")),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.timestamp())
            .map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "unexpected timestamp {other}"
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOperationGroup {
    pub hash: String,
    pub contents: Vec<RawContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawContent {
    pub kind: String,
    #[serde(flatten)]
    pub body: Value,
}

impl RawBlock {
    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| IndexerError::decode(format!("raw block: {e}")))
    }

    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        serde_json::from_value(value).map_err(|e| IndexerError::decode(format!("raw block: {e}")))
    }
}
