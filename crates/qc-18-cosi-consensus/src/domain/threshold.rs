//! Byzantine fault threshold
//!
//! A tree of `N` signers tolerates a bounded number of prepare-round
//! exceptions before nodes refuse to sign the commit round. The bound is
//! derived from `⌈N/3⌉`; [`FaultTolerance`] selects how strictly.

use serde::{Deserialize, Serialize};

/// `⌈N/3⌉`.
pub fn byzantine_threshold(node_count: usize) -> usize {
    node_count.div_ceil(3)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultTolerance {
    /// At most `⌈N/3⌉ - 1` exceptions: strictly fewer than a third of the tree.
    Classic,
    /// At most `⌈N/3⌉` exceptions.
    #[default]
    CeilThird,
}

impl FaultTolerance {
    /// Largest exception count that still lets a node sign the commit round.
    pub fn tolerated_faults(&self, node_count: usize) -> usize {
        let threshold = byzantine_threshold(node_count);
        match self {
            FaultTolerance::Classic => threshold.saturating_sub(1),
            FaultTolerance::CeilThird => threshold,
        }
    }

    pub fn exceeded(&self, exceptions: usize, node_count: usize) -> bool {
        exceptions > self.tolerated_faults(node_count)
    }
}
