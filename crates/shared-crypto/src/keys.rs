//! # Collective Signing Keys (secp256k1)
//!
//! Schnorr key pairs over secp256k1. Public keys are points and add up to
//! the aggregate key a collective signature verifies against.

use crate::CryptoError;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{NonZeroScalar, ProjectivePoint, Scalar};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::hash::{Hash, Hasher};
use zeroize::Zeroize;

/// Compressed SEC1 encoding; the identity point encodes as all zeros.
pub(crate) fn point_bytes(point: &ProjectivePoint) -> [u8; 33] {
    let encoded = point.to_affine().to_encoded_point(true);
    let mut bytes = [0u8; 33];
    if encoded.as_bytes().len() == 33 {
        bytes.copy_from_slice(encoded.as_bytes());
    }
    bytes
}

/// Public identity of a signer, or the sum of several.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CosiPublicKey(pub(crate) ProjectivePoint);

impl CosiPublicKey {
    /// Sum of public keys.
    ///
    /// An empty iterator yields the identity point.
    pub fn aggregate<'a>(keys: impl IntoIterator<Item = &'a CosiPublicKey>) -> Self {
        Self(
            keys.into_iter()
                .fold(ProjectivePoint::IDENTITY, |acc, key| acc + key.0),
        )
    }

    /// Parse a compressed SEC1 point (33 bytes).
    pub fn from_bytes(bytes: &[u8; 33]) -> Result<Self, CryptoError> {
        let public =
            k256::PublicKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(public.to_projective()))
    }

    /// Compressed SEC1 bytes.
    pub fn to_bytes(&self) -> [u8; 33] {
        point_bytes(&self.0)
    }
}

impl Hash for CosiPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl fmt::Display for CosiPublicKey {
    /// First four bytes of the x-coordinate, enough to tell nodes apart in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "{}", hex::encode(&bytes[1..5]))
    }
}

/// Schnorr key pair. The secret scalar is zeroized on drop.
#[derive(Clone)]
pub struct CosiKeyPair {
    secret: NonZeroScalar,
    public: CosiPublicKey,
}

impl CosiKeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        Self::from_secret(NonZeroScalar::random(&mut rand::thread_rng()))
    }

    /// Deterministic keypair for simulations and tests.
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::from_secret(NonZeroScalar::random(&mut rng))
    }

    /// Create from secret key bytes (32 bytes, big-endian).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let secret = k256::SecretKey::from_bytes((&bytes).into())
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_secret(secret.to_nonzero_scalar()))
    }

    fn from_secret(secret: NonZeroScalar) -> Self {
        let public = CosiPublicKey(ProjectivePoint::GENERATOR * *secret);
        Self { secret, public }
    }

    /// Get public key.
    pub fn public_key(&self) -> CosiPublicKey {
        self.public
    }

    pub(crate) fn secret_scalar(&self) -> Scalar {
        *self.secret
    }
}

impl Drop for CosiKeyPair {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl fmt::Debug for CosiKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosiKeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
