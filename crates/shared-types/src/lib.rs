//! # Shared Types Crate
//!
//! Block format used by the collective-signing subsystem and anything that
//! consumes its output.
//!
//! ## Contents
//!
//! - **Entities**: `Transaction`, `TransactionList`, `BlockHeader`, `Block`
//! - **Hashing**: double SHA-256, transaction Merkle root, header hash
//! - **Builders**: assemble a transaction list, header and block from a pool
//!
//! ## Header Linkage
//!
//! A block is only acceptable to a node when:
//! 1. `header.parent_hash` is that node's last accepted block hash
//! 2. `header.parent_key_hash` is that node's last accepted key-block hash
//! 3. `header.merkle_root` matches the transaction list
//! 4. `header_hash` matches the header
//!
//! `Block::check_linkage` evaluates all four as a single boolean.

pub mod builder;
pub mod entities;
pub mod errors;
pub mod hashing;

pub use builder::{build_block, build_header, build_transaction_list};
pub use entities::*;
pub use errors::CodecError;
pub use hashing::{header_hash, merkle_root, sha256d, SENTINEL_HASH};
