//! Schnorr CoSi adapters
//!
//! Implements the signer and verifier ports on top of `shared-crypto`.

use crate::ports::{CosiSigner, CosiVerifier};
use shared_crypto::{
    verify_signature_with_exceptions, Challenge, Commitment, Cosi, CosiKeyPair, CosiPublicKey,
    CosiSignature, CryptoError, Exception, Response,
};

/// Secp256k1 Schnorr signer for one round.
pub struct SchnorrSigner {
    cosi: Cosi,
}

impl SchnorrSigner {
    pub fn new(keypair: CosiKeyPair, aggregate_public: CosiPublicKey) -> Self {
        Self {
            cosi: Cosi::new(keypair, aggregate_public),
        }
    }

    /// Signer whose aggregate key is the sum of `identities`.
    pub fn for_tree(keypair: CosiKeyPair, identities: &[CosiPublicKey]) -> Self {
        Self::new(keypair, CosiPublicKey::aggregate(identities))
    }
}

impl CosiSigner for SchnorrSigner {
    fn public_key(&self) -> CosiPublicKey {
        self.cosi.public_key()
    }

    fn commit(&mut self, children: &[Commitment]) -> Commitment {
        self.cosi.commit(children)
    }

    fn create_challenge(&mut self, message: &[u8]) -> Result<Challenge, CryptoError> {
        self.cosi.create_challenge(message)
    }

    fn challenge(&mut self, received: &Challenge) -> Challenge {
        self.cosi.challenge(received)
    }

    fn response(&mut self, children: &[Response]) -> Result<Response, CryptoError> {
        self.cosi.response(children)
    }

    fn response_excluding_own(&mut self, children: &[Response]) -> Option<Response> {
        self.cosi.response_excluding_own(children)
    }

    fn signature(&self) -> Option<CosiSignature> {
        self.cosi.signature()
    }

    fn commitment(&self) -> Option<Commitment> {
        self.cosi.commitment()
    }
}

/// Stateless verifier for collective Schnorr signatures.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchnorrVerifier;

impl CosiVerifier for SchnorrVerifier {
    fn verify_with_exceptions(
        &self,
        aggregate: &CosiPublicKey,
        message: &[u8],
        signature: &CosiSignature,
        exceptions: &[Exception],
    ) -> Result<(), CryptoError> {
        verify_signature_with_exceptions(aggregate, message, signature, exceptions)
    }
}
