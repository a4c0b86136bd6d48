//! # Shared Crypto - Collective Signing Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `keys` | secp256k1 Schnorr keys | Node identity, aggregate public key |
//! | `cosi` | Collective Schnorr (CoSi) | Tree-aggregated block signatures |
//!
//! ## Security Properties
//!
//! - Fresh random nonce per round, zeroized on drop
//! - Challenge binds aggregate commitment, aggregate key and message
//! - Exceptions are deduplicated by key before verification

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cosi;
pub mod errors;
pub mod keys;

// Re-exports
pub use cosi::{
    verify_signature_with_exceptions, Challenge, Commitment, Cosi, CosiSignature, Exception,
    Response,
};
pub use errors::CryptoError;
pub use keys::{CosiKeyPair, CosiPublicKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
