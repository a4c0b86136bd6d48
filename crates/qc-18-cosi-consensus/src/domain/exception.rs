//! Exception set carried with every response
//!
//! Each exception names a signer whose share is absent from the aggregate
//! response. Entries are unique by public key and keep arrival order.

use shared_crypto::{CosiPublicKey, Exception};
use std::collections::HashSet;

#[derive(Clone, Debug, Default)]
pub struct ExceptionList {
    entries: Vec<Exception>,
    seen: HashSet<CosiPublicKey>,
}

impl ExceptionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exception. Returns `false` if the key is already listed.
    pub fn insert(&mut self, exception: Exception) -> bool {
        if !self.seen.insert(exception.public_key) {
            return false;
        }
        self.entries.push(exception);
        true
    }

    pub fn contains(&self, key: &CosiPublicKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Exception] {
        &self.entries
    }

    pub fn to_vec(&self) -> Vec<Exception> {
        self.entries.clone()
    }
}

impl Extend<Exception> for ExceptionList {
    fn extend<I: IntoIterator<Item = Exception>>(&mut self, iter: I) {
        for exception in iter {
            self.insert(exception);
        }
    }
}

impl FromIterator<Exception> for ExceptionList {
    fn from_iter<I: IntoIterator<Item = Exception>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl PartialEq for ExceptionList {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for ExceptionList {}
