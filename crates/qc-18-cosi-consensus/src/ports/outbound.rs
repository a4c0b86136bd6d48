//! Driven ports (outbound dependencies)

use crate::domain::{CosiMessage, NodeIndex, TransportError, TreeRole};
use async_trait::async_trait;
use shared_crypto::{
    Challenge, Commitment, CosiPublicKey, CosiSignature, CryptoError, Exception, Response,
};

/// Per-round collective signing state of one node.
///
/// One instance serves exactly one round of one signing instance. The
/// aggregate public key is fixed at construction.
pub trait CosiSigner: Send + Sync {
    fn public_key(&self) -> CosiPublicKey;

    /// Draw a fresh commitment and add the children's aggregates to it.
    fn commit(&mut self, children: &[Commitment]) -> Commitment;

    /// Root only: challenge binding the aggregate commitment to `message`.
    fn create_challenge(&mut self, message: &[u8]) -> Result<Challenge, CryptoError>;

    /// Adopt the challenge received from the parent.
    fn challenge(&mut self, received: &Challenge) -> Challenge;

    /// Own response share plus the children's aggregates.
    fn response(&mut self, children: &[Response]) -> Result<Response, CryptoError>;

    /// Sum of the children's aggregates, leaving out this node's share.
    fn response_excluding_own(&mut self, children: &[Response]) -> Option<Response>;

    /// `(challenge, aggregate response)` once both exist.
    fn signature(&self) -> Option<CosiSignature>;

    /// This node's own commitment for the round.
    fn commitment(&self) -> Option<Commitment>;
}

/// Collective signature verification.
pub trait CosiVerifier: Send + Sync {
    fn verify_with_exceptions(
        &self,
        aggregate: &CosiPublicKey,
        message: &[u8],
        signature: &CosiSignature,
        exceptions: &[Exception],
    ) -> Result<(), CryptoError>;
}

/// A node's position in the signing tree and its links to neighbours.
#[async_trait]
pub trait TreeTransport: Send + Sync {
    fn index(&self) -> NodeIndex;

    fn parent(&self) -> Option<NodeIndex>;

    fn children(&self) -> &[NodeIndex];

    fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    fn role(&self) -> TreeRole {
        TreeRole::of(!self.is_root(), self.children().len())
    }

    fn public_key(&self) -> CosiPublicKey;

    /// Public keys of every node in the tree.
    fn all_identities(&self) -> Vec<CosiPublicKey>;

    /// Deliver `message` to the node at `to`.
    async fn send_to(&self, to: NodeIndex, message: CosiMessage) -> Result<(), TransportError>;
}
