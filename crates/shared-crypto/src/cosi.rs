//! # Collective Schnorr Signing (CoSi)
//!
//! One `Cosi` value holds a single node's state for one signing round.
//!
//! ## Round Algebra
//!
//! | Phase | Node `i` | Aggregation |
//! |-------|----------|-------------|
//! | Commitment | `V_i = g^v_i` (fresh nonce `v_i`) | `V = Σ V_i` up the tree |
//! | Challenge | root: `c = H(V ‖ X ‖ m)` | passed down unchanged |
//! | Response | `r_i = v_i - c·x_i` | `r = Σ r_i` up the tree |
//!
//! The signature is `(c, r)`. A node that cannot vouch for the message
//! contributes an `Exception` (its key and commitment) instead of `r_i`;
//! the verifier folds those back in:
//!
//! ```text
//! X' = X - Σ X_e
//! V' = g^r + c·X' + Σ V_e
//! accept iff H(V' ‖ X ‖ m) == c
//! ```

use crate::keys::{point_bytes, CosiKeyPair, CosiPublicKey};
use crate::CryptoError;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::Field;
use k256::{ProjectivePoint, Scalar, U256};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use zeroize::Zeroize;

/// Aggregate (or single) commitment point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Commitment(ProjectivePoint);

impl Commitment {
    /// Compressed SEC1 bytes of the point.
    pub fn to_bytes(&self) -> [u8; 33] {
        point_bytes(&self.0)
    }
}

/// Round challenge scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Challenge(Scalar);

impl Challenge {
    /// Big-endian scalar bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }
}

/// Response share, or the sum of several.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response(Scalar);

impl Response {
    /// Sum of responses; `None` when there is nothing to sum.
    pub fn aggregate<'a>(responses: impl IntoIterator<Item = &'a Response>) -> Option<Self> {
        responses
            .into_iter()
            .fold(None, |acc: Option<Scalar>, r| Some(acc.unwrap_or(Scalar::ZERO) + r.0))
            .map(Self)
    }

    /// Big-endian scalar bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }
}

/// Collective signature `(c, r)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CosiSignature {
    /// `c`, bound to the aggregate commitment and message.
    pub challenge: Challenge,
    /// `r`, the sum of every contributed share.
    pub response: Response,
}

impl CosiSignature {
    /// `c ‖ r`, 64 bytes.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.challenge.to_bytes());
        bytes[32..].copy_from_slice(&self.response.to_bytes());
        bytes
    }
}

/// A signer that did not contribute a response share.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Exception {
    /// Key of the signer that withheld its share.
    pub public_key: CosiPublicKey,
    /// That signer's own commitment for the round.
    pub commitment: Commitment,
}

impl std::hash::Hash for Commitment {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

/// `H(V ‖ X ‖ m)` reduced into the scalar field.
fn challenge_scalar(commitment: &ProjectivePoint, aggregate: &ProjectivePoint, message: &[u8]) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(point_bytes(commitment));
    hasher.update(point_bytes(aggregate));
    hasher.update(message);
    <Scalar as Reduce<U256>>::reduce_bytes(&hasher.finalize())
}

/// Per-round signing state of one node.
pub struct Cosi {
    keypair: CosiKeyPair,
    aggregate_public: CosiPublicKey,
    nonce: Option<Scalar>,
    commitment: Option<Commitment>,
    aggregate_commitment: Option<Commitment>,
    challenge: Option<Challenge>,
    aggregate_response: Option<Response>,
}

impl Cosi {
    /// Fresh round state for `keypair` signing under `aggregate_public`.
    pub fn new(keypair: CosiKeyPair, aggregate_public: CosiPublicKey) -> Self {
        Self {
            keypair,
            aggregate_public,
            nonce: None,
            commitment: None,
            aggregate_commitment: None,
            challenge: None,
            aggregate_response: None,
        }
    }

    /// This signer's public key.
    pub fn public_key(&self) -> CosiPublicKey {
        self.keypair.public_key()
    }

    /// Draw a fresh nonce and return `V_i`.
    pub fn create_commitment(&mut self) -> Commitment {
        let nonce = Scalar::random(&mut rand::thread_rng());
        let commitment = Commitment(ProjectivePoint::GENERATOR * nonce);
        self.nonce = Some(nonce);
        self.commitment = Some(commitment);
        self.aggregate_commitment = Some(commitment);
        commitment
    }

    /// Own commitment plus every child aggregate.
    pub fn commit(&mut self, children: &[Commitment]) -> Commitment {
        let own = self.create_commitment();
        let aggregate = Commitment(children.iter().fold(own.0, |acc, c| acc + c.0));
        self.aggregate_commitment = Some(aggregate);
        aggregate
    }

    /// Root only: bind the aggregate commitment to `message`.
    pub fn create_challenge(&mut self, message: &[u8]) -> Result<Challenge, CryptoError> {
        if message.is_empty() {
            return Err(CryptoError::EmptyMessage);
        }
        let commitment = self
            .aggregate_commitment
            .ok_or(CryptoError::MissingCommitment)?;
        let challenge = Challenge(challenge_scalar(
            &commitment.0,
            &self.aggregate_public.0,
            message,
        ));
        self.challenge = Some(challenge);
        Ok(challenge)
    }

    /// Adopt the challenge received from the parent.
    pub fn challenge(&mut self, received: &Challenge) -> Challenge {
        self.challenge = Some(*received);
        *received
    }

    /// This node's own share `r_i = v_i - c·x_i`.
    pub fn create_response(&self) -> Result<Response, CryptoError> {
        let nonce = self.nonce.ok_or(CryptoError::MissingCommitment)?;
        let challenge = self.challenge.ok_or(CryptoError::MissingChallenge)?;
        Ok(Response(nonce - challenge.0 * self.keypair.secret_scalar()))
    }

    /// Own share plus every child aggregate.
    pub fn response(&mut self, children: &[Response]) -> Result<Response, CryptoError> {
        let own = self.create_response()?;
        let aggregate = Response(children.iter().fold(own.0, |acc, r| acc + r.0));
        self.aggregate_response = Some(aggregate);
        Ok(aggregate)
    }

    /// Child aggregates only; used when this node contributes an exception.
    pub fn response_excluding_own(&mut self, children: &[Response]) -> Option<Response> {
        let aggregate = Response::aggregate(children);
        self.aggregate_response = aggregate;
        aggregate
    }

    /// `(c, r)` once both the challenge and an aggregate response exist.
    pub fn signature(&self) -> Option<CosiSignature> {
        Some(CosiSignature {
            challenge: self.challenge?,
            response: self.aggregate_response?,
        })
    }

    /// This node's own commitment, used to build its exception.
    pub fn commitment(&self) -> Option<Commitment> {
        self.commitment
    }

    /// Exception entry for this node, if it has committed.
    pub fn exception(&self) -> Option<Exception> {
        Some(Exception {
            public_key: self.public_key(),
            commitment: self.commitment?,
        })
    }
}

impl Drop for Cosi {
    fn drop(&mut self) {
        self.nonce.zeroize();
    }
}

/// Verify `signature` over `message` against `aggregate`, discounting the
/// listed exceptions. Duplicate exceptions for one key count once.
pub fn verify_signature_with_exceptions(
    aggregate: &CosiPublicKey,
    message: &[u8],
    signature: &CosiSignature,
    exceptions: &[Exception],
) -> Result<(), CryptoError> {
    let mut seen = HashSet::with_capacity(exceptions.len());
    let mut effective_public = aggregate.0;
    let mut excepted_commitments = ProjectivePoint::IDENTITY;

    for exception in exceptions {
        if seen.insert(exception.public_key) {
            effective_public -= exception.public_key.0;
            excepted_commitments += exception.commitment.0;
        }
    }

    let challenge = signature.challenge.0;
    let reconstructed = ProjectivePoint::GENERATOR * signature.response.0
        + effective_public * challenge
        + excepted_commitments;

    if challenge_scalar(&reconstructed, &aggregate.0, message) == challenge {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerificationFailed)
    }
}
