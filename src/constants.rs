use crate::base::amount::Amount;

// version

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// chain constants

pub const MUTEZ_SCALE: u64 = 1_000_000;
pub const OP_HASH_LEN: usize = 51;
pub const PROPOSAL_HASH_LEN: usize = 51;
pub const ADDRESS_LEN: usize = 36;

// indexer constants

pub const BLOCK_REPORTING_FREQ_NUM: u32 = 1000;

// protocol upgrade invoices
//
// Credited when the matching version activates, recorded as a Migration
// operation so the credit reverts with its block.

pub const PROTO2_INVOICE_ADDRESS: &str = "tz1iSQEcaGpUn6EW5uAy3XhPiNg7BHMnRSXi";
pub const PROTO2_INVOICE_AMOUNT: Amount = Amount(100 * MUTEZ_SCALE);

// governance

/// Account whose proposals decide the vote unconditionally, from v3 on
pub const PROTO3_DICTATOR_ADDRESS: &str = "tz1Ke2h7sDdakHJQh8WX4Z372du1KChsksyU";
