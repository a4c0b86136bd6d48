//! Configuration for collective block signing

use crate::domain::FaultTolerance;
use serde::Deserialize;
use std::time::Duration;

/// Runtime configuration shared by every node of a signing tree
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CosiConfig {
    /// Maximum transactions per block (default: 10)
    pub block_size: usize,

    /// How many prepare exceptions the commit round tolerates
    pub fault_tolerance: FaultTolerance,

    /// Wall-clock bound on a whole signing instance (default: none)
    pub round_timeout_ms: Option<u64>,

    /// Bound on waiting for the local block verification (default: none).
    /// Expiry counts as a failed verification.
    pub verification_timeout_ms: Option<u64>,

    /// Artificial verification delay per 500 KiB of encoded block, to
    /// simulate validating large blocks (default: none)
    pub simulated_latency_per_500kib_ms: Option<u64>,
}

impl Default for CosiConfig {
    fn default() -> Self {
        Self {
            block_size: crate::DEFAULT_BLOCK_SIZE,
            fault_tolerance: FaultTolerance::default(),
            round_timeout_ms: None,
            verification_timeout_ms: None,
            simulated_latency_per_500kib_ms: None,
        }
    }
}

impl CosiConfig {
    pub fn round_timeout(&self) -> Option<Duration> {
        self.round_timeout_ms.map(Duration::from_millis)
    }

    pub fn verification_timeout(&self) -> Option<Duration> {
        self.verification_timeout_ms.map(Duration::from_millis)
    }

    pub fn simulated_latency(&self) -> Option<Duration> {
        self.simulated_latency_per_500kib_ms
            .map(Duration::from_millis)
    }
}
