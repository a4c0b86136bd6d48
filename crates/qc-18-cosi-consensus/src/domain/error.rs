//! Error types for the collective signing subsystem

use super::{NodeIndex, Phase, Round};
use shared_crypto::CryptoError;
use shared_types::CodecError;

/// Delivery failure reported by a tree transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeIndex),

    #[error("Link to node {0} is down")]
    LinkDown(NodeIndex),
}

/// Collective signing error types
#[derive(Debug, thiserror::Error)]
pub enum CosiError {
    /// The root found the pool empty when asked to assemble a block.
    #[error("No transactions available to build a block")]
    NoTransactionsAvailable,

    #[error("Signing primitive failed: {0}")]
    SigningPrimitive(#[from] CryptoError),

    #[error("Block codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// More contributions arrived than the node has children.
    #[error("Unexpected {phase} contribution in {round} round: expected {expected}")]
    UnexpectedContribution {
        round: Round,
        phase: Phase,
        expected: usize,
    },

    #[error("{phase} message from node {from}, which is not a tree neighbour in that direction")]
    UnexpectedSender { from: NodeIndex, phase: Phase },

    #[error("No working block for the {0} round")]
    MissingWorkingBlock(Round),

    #[error("Commit challenge requested before the prepare round completed")]
    PrepareIncomplete,

    #[error("Signing instance timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Inbox closed before the signing instance completed")]
    InboxClosed,

    #[error("Block verification task ended without reporting")]
    VerificationTaskDropped,

    #[error("Node task failed: {0}")]
    TaskFailed(String),
}

impl CosiError {
    /// Errors that end a node's signing instance. Everything else is logged
    /// and the node keeps processing its inbox.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CosiError::NoTransactionsAvailable
                | CosiError::Timeout { .. }
                | CosiError::InboxClosed
                | CosiError::TaskFailed(_)
        )
    }
}

/// Result type for collective signing operations
pub type CosiResult<T> = Result<T, CosiError>;
