//! Per-node view of the chain head

use serde::{Deserialize, Serialize};
use shared_types::{Block, Hash};

/// Hashes a proposed block must link to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub last_block: Hash,
    pub last_key_block: Hash,
}

impl ChainTip {
    pub fn new(last_block: Hash, last_key_block: Hash) -> Self {
        Self {
            last_block,
            last_key_block,
        }
    }

    /// Advance the tip past a certified block. The key-block is unchanged.
    pub fn accept(&mut self, block: &Block) {
        self.last_block = block.header_hash;
    }

    /// Whether `block` links to this tip and is internally consistent.
    pub fn links(&self, block: &Block) -> bool {
        block.check_linkage(&self.last_block, &self.last_key_block)
    }
}
