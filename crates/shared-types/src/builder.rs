//! # Block Builders
//!
//! Helpers that turn a slice of pending transactions into a candidate block.
//! They never mutate the pool; the caller truncates it by
//! `TransactionList::tx_count` afterwards.

use crate::entities::{Block, BlockHeader, Hash, Transaction, TransactionList, BLOCK_VERSION};
use crate::hashing::{header_hash, merkle_root};

/// Take the first `min(n, pool.len())` transactions.
pub fn build_transaction_list(pool: &[Transaction], n: usize) -> TransactionList {
    let take = n.min(pool.len());
    TransactionList::new(pool[..take].to_vec())
}

/// Header linking `list` to the given parent block and key-block.
pub fn build_header(list: &TransactionList, parent_hash: Hash, parent_key_hash: Hash) -> BlockHeader {
    BlockHeader {
        version: BLOCK_VERSION,
        parent_hash,
        parent_key_hash,
        merkle_root: merkle_root(list),
    }
}

/// Pair a list with its header and record the header hash.
pub fn build_block(list: TransactionList, header: BlockHeader) -> Block {
    Block {
        header_hash: header_hash(&header),
        header,
        transactions: list,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::SENTINEL_HASH;
    use proptest::prelude::*;

    fn pool(size: usize) -> Vec<Transaction> {
        (0..size).map(|i| Transaction::new(format!("tx-{i}").into_bytes())).collect()
    }

    #[test]
    fn test_list_takes_prefix() {
        let pool = pool(5);
        let list = build_transaction_list(&pool, 3);
        assert_eq!(list.tx_count, 3);
        assert_eq!(list.transactions, pool[..3].to_vec());
    }

    #[test]
    fn test_list_caps_at_pool_size() {
        let list = build_transaction_list(&pool(2), 10);
        assert_eq!(list.tx_count, 2);
    }

    #[test]
    fn test_empty_list_has_sentinel_root() {
        let list = build_transaction_list(&[], 10);
        let header = build_header(&list, [0; 32], [0; 32]);
        assert_eq!(header.merkle_root, SENTINEL_HASH);
    }

    #[test]
    fn test_block_records_header_hash() {
        let list = build_transaction_list(&pool(4), 4);
        let header = build_header(&list, [5; 32], [6; 32]);
        let block = build_block(list, header.clone());
        assert_eq!(block.header_hash, header_hash(&header));
        assert!(block.check_linkage(&[5; 32], &[6; 32]));
    }

    proptest! {
        #[test]
        fn prop_merkle_root_survives_serialization(size in 1usize..40, n in 1usize..50) {
            let pool = pool(size);
            let list = build_transaction_list(&pool, n);
            let header = build_header(&list, [1; 32], [2; 32]);
            let block = build_block(list, header);

            let json = serde_json::to_vec(&block).unwrap();
            let decoded: Block = serde_json::from_slice(&json).unwrap();
            prop_assert_eq!(merkle_root(&decoded.transactions), block.header.merkle_root);

            let decoded = Block::from_bytes(&block.to_bytes().unwrap()).unwrap();
            prop_assert_eq!(merkle_root(&decoded.transactions), block.header.merkle_root);
        }
    }
}
