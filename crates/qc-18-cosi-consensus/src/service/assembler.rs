//! Block assembler
//!
//! Takes a prefix of the pending pool, builds a block linked to the chain
//! tip, and truncates the pool by exactly the number of transactions the
//! block reports.

use crate::domain::{ChainTip, CosiError, CosiResult, TransactionPool};
use shared_types::{build_block, build_header, build_transaction_list, Block};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct BlockAssembler {
    pool: Arc<TransactionPool>,
}

impl BlockAssembler {
    pub fn new(pool: Arc<TransactionPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<TransactionPool> {
        &self.pool
    }

    /// Build a block of at most `max_transactions` (at least one) pending
    /// transactions.
    pub fn assemble(&self, max_transactions: usize, tip: &ChainTip) -> CosiResult<Block> {
        self.pool.with_exclusive(|pending| {
            if pending.is_empty() {
                return Err(CosiError::NoTransactionsAvailable);
            }

            let list = build_transaction_list(&pending[..], max_transactions.max(1));
            let header = build_header(&list, tip.last_block, tip.last_key_block);
            let block = build_block(list, header);
            pending.drain(..block.tx_count());

            debug!(
                tx_count = block.tx_count(),
                remaining = pending.len(),
                "Assembled block"
            );
            Ok(block)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_types::Transaction;

    fn pool(size: usize) -> Arc<TransactionPool> {
        Arc::new(TransactionPool::with_transactions(
            (0..size).map(|i| Transaction::new(format!("tx-{i}").into_bytes())),
        ))
    }

    #[test]
    fn test_empty_pool_is_an_error() {
        let assembler = BlockAssembler::new(pool(0));
        assert!(matches!(
            assembler.assemble(10, &ChainTip::default()),
            Err(CosiError::NoTransactionsAvailable)
        ));
    }

    #[test]
    fn test_block_links_to_tip() {
        let assembler = BlockAssembler::new(pool(3));
        let tip = ChainTip::new([4; 32], [5; 32]);
        let block = assembler.assemble(10, &tip).unwrap();
        assert_eq!(block.tx_count(), 3);
        assert!(tip.links(&block));
        assert!(assembler.pool().is_empty());
    }

    #[test]
    fn test_takes_oldest_first() {
        let assembler = BlockAssembler::new(pool(5));
        let block = assembler.assemble(2, &ChainTip::default()).unwrap();
        assert_eq!(block.transactions.transactions[0].data, b"tx-0".to_vec());
        assert_eq!(block.transactions.transactions[1].data, b"tx-1".to_vec());
        assert_eq!(assembler.pool().snapshot()[0].data, b"tx-2".to_vec());
    }

    proptest! {
        #[test]
        fn prop_pool_is_conserved(size in 1usize..60, n in 1usize..25) {
            let assembler = BlockAssembler::new(pool(size));
            let mut consumed = 0;
            let last = loop {
                match assembler.assemble(n, &ChainTip::default()) {
                    Ok(block) => {
                        prop_assert!(block.tx_count() <= n);
                        prop_assert!(block.tx_count() > 0);
                        consumed += block.tx_count();
                        prop_assert_eq!(consumed + assembler.pool().len(), size);
                    }
                    Err(e) => break e,
                }
            };
            prop_assert!(matches!(last, CosiError::NoTransactionsAvailable));
            prop_assert_eq!(consumed, size);
        }
    }
}
