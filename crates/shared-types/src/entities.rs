//! # Core Domain Entities
//!
//! Transactions and the block that carries them through both signing rounds.

use serde::{Deserialize, Serialize};

use crate::errors::CodecError;
use crate::hashing::{header_hash, merkle_root, sha256d};

/// A 32-byte hash (double SHA-256).
pub type Hash = [u8; 32];

/// Header format version written by `build_header`.
pub const BLOCK_VERSION: u32 = 1;

/// A pending client transaction.
///
/// The payload is opaque to the signing protocol; only its hash feeds the
/// Merkle root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub data: Vec<u8>,
}

impl Transaction {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Double SHA-256 of the payload.
    pub fn hash(&self) -> Hash {
        sha256d(&self.data)
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Ordered transactions included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionList {
    pub transactions: Vec<Transaction>,
    /// Number of pool entries this list consumed.
    pub tx_count: usize,
    /// Sum of payload sizes.
    pub total_size: usize,
}

impl TransactionList {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        let tx_count = transactions.len();
        let total_size = transactions.iter().map(Transaction::size).sum();
        Self {
            transactions,
            tx_count,
            total_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Hashes in list order, the Merkle leaves.
    pub fn hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }
}

/// Block header linking a block to the previous block and key-block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    /// Hash of the last accepted block.
    pub parent_hash: Hash,
    /// Hash of the last accepted key-block.
    pub parent_key_hash: Hash,
    /// Merkle root over the transaction hashes.
    pub merkle_root: Hash,
}

/// A candidate block, signed unchanged by both rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header_hash: Hash,
    pub header: BlockHeader,
    pub transactions: TransactionList,
}

impl Block {
    /// Canonical serialization, used as the signing message of both rounds.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    /// Number of transactions in the block.
    pub fn tx_count(&self) -> usize {
        self.transactions.tx_count
    }

    /// Evaluate the four header invariants against a node's chain tip.
    ///
    /// No partial credit: any mismatch yields `false`.
    pub fn check_linkage(&self, last_block: &Hash, last_key_block: &Hash) -> bool {
        self.header.parent_hash == *last_block
            && self.header.parent_key_hash == *last_key_block
            && self.header.merkle_root == merkle_root(&self.transactions)
            && self.header_hash == header_hash(&self.header)
    }
}
