//! Block verifier
//!
//! Checks a proposed block against the node's chain tip on a blocking
//! worker. The outcome arrives through a oneshot channel so the node keeps
//! processing messages until it needs the result for its prepare response.

use crate::domain::{ChainTip, CosiError, CosiResult};
use crate::metrics;
use shared_types::Block;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

const LATENCY_CHUNK_BYTES: usize = 500 * 1024;

/// A verification running in the background.
#[derive(Debug)]
pub struct PendingVerification {
    outcome: oneshot::Receiver<bool>,
}

impl PendingVerification {
    /// Wait for the outcome. An expired `timeout` counts as a failed check.
    pub async fn outcome(self, timeout: Option<Duration>) -> CosiResult<bool> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.outcome).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "Block verification timed out");
                    return Ok(false);
                }
            },
            None => self.outcome.await,
        };
        received.map_err(|_| CosiError::VerificationTaskDropped)
    }
}

/// Start verifying `block` against `tip`.
///
/// `latency_per_chunk` adds a delay for every full 500 KiB of encoded block.
pub fn spawn_verification(
    block: Block,
    tip: ChainTip,
    latency_per_chunk: Option<Duration>,
) -> PendingVerification {
    let (tx, rx) = oneshot::channel();

    tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        if let Some(per_chunk) = latency_per_chunk {
            simulate_latency(&block, per_chunk);
        }

        let verified = tip.links(&block);
        metrics::record_block_verification(started.elapsed().as_secs_f64(), verified);
        debug!(verified, tx_count = block.tx_count(), "Block verification finished");

        if tx.send(verified).is_err() {
            debug!("Block verification outcome no longer awaited");
        }
    });

    PendingVerification { outcome: rx }
}

fn simulate_latency(block: &Block, per_chunk: Duration) {
    let size = match block.to_bytes() {
        Ok(bytes) => bytes.len(),
        Err(e) => {
            warn!(error = %e, "Could not size block for simulated latency");
            return;
        }
    };
    let chunks = (size / LATENCY_CHUNK_BYTES) as u32;
    if chunks > 0 {
        std::thread::sleep(per_chunk * chunks);
    }
}
