//! Commit engine for a delegated proof-of-stake chain indexer
//!
//! Blocks arrive as raw node payloads, decode into ready-to-apply
//! contents, and commit through fixed phases against a block-lifetime
//! [cache::BlockContext]. Every apply has an exact-inverse revert, and a
//! whole block's effects persist as one atomic batch.

pub mod account;
pub mod base;
pub mod block;
pub mod cache;
pub mod commit;
pub mod constants;
pub mod cycle;
pub mod error;
pub mod handler;
pub mod operation;
pub mod protocol;
pub mod rollup;
pub mod state;
pub mod store;
pub mod voting;
