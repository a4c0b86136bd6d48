//! Pending transaction pool
//!
//! FIFO queue shared between client submission and block assembly. The
//! assembler takes exclusive access for the whole take-then-truncate step so
//! concurrent submissions never slip between building a list and removing
//! its prefix.

use parking_lot::Mutex;
use shared_types::Transaction;

#[derive(Debug, Default)]
pub struct TransactionPool {
    pending: Mutex<Vec<Transaction>>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(transactions: impl IntoIterator<Item = Transaction>) -> Self {
        Self {
            pending: Mutex::new(transactions.into_iter().collect()),
        }
    }

    pub fn submit(&self, transaction: Transaction) {
        self.pending.lock().push(transaction);
    }

    pub fn submit_batch(&self, transactions: impl IntoIterator<Item = Transaction>) {
        self.pending.lock().extend(transactions);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Copy of the pending queue, oldest first.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.pending.lock().clone()
    }

    /// Run `f` with the pool locked.
    pub(crate) fn with_exclusive<R>(&self, f: impl FnOnce(&mut Vec<Transaction>) -> R) -> R {
        let mut pending = self.pending.lock();
        f(&mut pending)
    }
}
