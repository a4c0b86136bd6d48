//! # Error Types
//!
//! Errors raised while encoding or decoding block data.

use thiserror::Error;

/// Canonical serialization failures.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Block could not be encoded.
    #[error("Block encoding failed: {0}")]
    Encode(String),

    /// Bytes did not decode to a block.
    #[error("Block decoding failed: {0}")]
    Decode(String),
}
