//! # Hashing
//!
//! Double SHA-256 everywhere: transaction ids, Merkle nodes, header hash.
//!
//! ## Merkle Tree
//!
//! Binary hash tree where each parent is `H(left || right)`. Leaves are
//! padded to the next power of two with `SENTINEL_HASH` (a single leaf is
//! padded to two). An empty list hashes to `SENTINEL_HASH`.

use sha2::{Digest, Sha256};

use crate::entities::{BlockHeader, Hash, TransactionList};

/// Padding leaf and root of an empty transaction list.
pub const SENTINEL_HASH: Hash = [0u8; 32];

/// Compute double SHA-256 (Bitcoin-style).
#[inline]
pub fn sha256d(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

#[inline]
fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(left);
    bytes[32..].copy_from_slice(right);
    sha256d(&bytes)
}

/// Merkle root of a transaction list.
pub fn merkle_root(list: &TransactionList) -> Hash {
    merkle_root_of(list.hashes())
}

/// Merkle root of raw leaf hashes.
pub fn merkle_root_of(mut leaves: Vec<Hash>) -> Hash {
    if leaves.is_empty() {
        return SENTINEL_HASH;
    }

    let padded = leaves.len().next_power_of_two().max(2);
    leaves.resize(padded, SENTINEL_HASH);

    while leaves.len() > 1 {
        leaves = leaves
            .chunks_exact(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    leaves[0]
}

/// Hash of a block header.
///
/// Fields are encoded little-endian in declaration order.
pub fn header_hash(header: &BlockHeader) -> Hash {
    let mut bytes = Vec::with_capacity(4 + 32 * 3);
    bytes.extend_from_slice(&header.version.to_le_bytes());
    bytes.extend_from_slice(&header.parent_hash);
    bytes.extend_from_slice(&header.parent_key_hash);
    bytes.extend_from_slice(&header.merkle_root);
    sha256d(&bytes)
}
