//! Certificates produced by a completed signing instance

use super::{CosiResult, Round};
use shared_crypto::{
    verify_signature_with_exceptions, CosiPublicKey, CosiSignature, CryptoError, Exception,
};
use shared_types::Block;

/// Outcome of one round as seen by the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundCertificate {
    pub round: Round,
    /// `None` when no node in the tree contributed a share.
    pub signature: Option<CosiSignature>,
    pub exceptions: Vec<Exception>,
}

impl RoundCertificate {
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Check the signature over `message`, discounting the exceptions.
    pub fn verify(&self, aggregate: &CosiPublicKey, message: &[u8]) -> Result<(), CryptoError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(CryptoError::SignatureVerificationFailed)?;
        verify_signature_with_exceptions(aggregate, message, signature, &self.exceptions)
    }
}

/// A block together with both collective signatures over it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockCertificate {
    pub block: Block,
    pub prepare: RoundCertificate,
    pub commit: RoundCertificate,
}

impl BlockCertificate {
    /// Verify both rounds against the tree's aggregate public key.
    pub fn verify(&self, aggregate: &CosiPublicKey) -> CosiResult<()> {
        let message = self.block.to_bytes()?;
        self.prepare.verify(aggregate, &message)?;
        self.commit.verify(aggregate, &message)?;
        Ok(())
    }
}

/// What `CosiNode::run` hands back once a node is done with an instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeOutcome {
    /// The root assembled both certificates.
    Root(BlockCertificate),
    /// A non-root node sent its commit response.
    Participant {
        /// Whether this node contributed an exception instead of a share.
        refused: bool,
    },
}

impl NodeOutcome {
    pub fn certificate(&self) -> Option<&BlockCertificate> {
        match self {
            NodeOutcome::Root(certificate) => Some(certificate),
            NodeOutcome::Participant { .. } => None,
        }
    }
}
