//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Response or challenge requested before a commitment exists
    #[error("No commitment has been created for this round")]
    MissingCommitment,

    /// Response requested before the round challenge is known
    #[error("No challenge has been set for this round")]
    MissingChallenge,

    /// Challenge requested over an empty message
    #[error("Cannot create a challenge over an empty message")]
    EmptyMessage,

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,
}
