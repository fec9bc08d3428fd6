//! Indexer fault taxonomy
//!
//! Every fault aborts the block being processed; the store is untouched
//! because effects only become durable in the final batch write.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IndexerError {
    /// Raw content did not have the shape its kind tag promised
    #[error("decode fault: {0}")]
    Decode(String),

    /// Operation kind unknown or not defined for the active protocol
    #[error("unsupported operation kind: {0}")]
    UnsupportedKind(String),

    /// An internal consistency rule was broken
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An operation referenced an entity that does not exist
    #[error("referential fault: {0}")]
    ReferentialFault(String),
}

impl IndexerError {
    pub fn decode(msg: impl Into<String>) -> anyhow::Error {
        Self::Decode(msg.into()).into()
    }

    pub fn invariant(msg: impl Into<String>) -> anyhow::Error {
        Self::InvariantViolation(msg.into()).into()
    }

    pub fn referential(msg: impl Into<String>) -> anyhow::Error {
        Self::ReferentialFault(msg.into()).into()
    }
}
