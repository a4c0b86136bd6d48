//! Protocol messages exchanged along tree edges
//!
//! Announcements and challenges flow from a parent to its children;
//! commitments and responses flow back up. Every message names the round it
//! belongs to, so the two rounds of an instance can interleave freely.

use super::{Phase, Round};
use shared_crypto::{Challenge, Commitment, CosiSignature, Exception, Response};
use shared_types::Block;

/// Position of a node in the signing tree. The root is always `0`.
pub type NodeIndex = usize;

/// Opens a round; carries no payload beyond the round tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub round: Round,
}

/// Aggregate commitment of a subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitmentMessage {
    pub round: Round,
    pub commitment: Commitment,
}

/// Prepare-round challenge, carrying the block every node must check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengePrepare {
    pub challenge: Challenge,
    pub block: Block,
}

/// Commit-round challenge, carrying the finished prepare certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeCommit {
    pub challenge: Challenge,
    /// `None` when no subtree produced a prepare response at all.
    pub prepare_signature: Option<CosiSignature>,
    pub exceptions: Vec<Exception>,
}

/// Aggregate response of a subtree plus every exception raised in it.
///
/// `response` is `None` only when nobody in the subtree contributed a share.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseMessage {
    pub round: Round,
    pub response: Option<Response>,
    pub exceptions: Vec<Exception>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CosiMessage {
    Announcement(Announcement),
    Commitment(CommitmentMessage),
    ChallengePrepare(ChallengePrepare),
    ChallengeCommit(ChallengeCommit),
    Response(ResponseMessage),
}

impl CosiMessage {
    pub fn round(&self) -> Round {
        match self {
            CosiMessage::Announcement(m) => m.round,
            CosiMessage::Commitment(m) => m.round,
            CosiMessage::ChallengePrepare(_) => Round::Prepare,
            CosiMessage::ChallengeCommit(_) => Round::Commit,
            CosiMessage::Response(m) => m.round,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            CosiMessage::Announcement(_) => Phase::Announcement,
            CosiMessage::Commitment(_) => Phase::Commitment,
            CosiMessage::ChallengePrepare(_) | CosiMessage::ChallengeCommit(_) => Phase::Challenge,
            CosiMessage::Response(_) => Phase::Response,
        }
    }
}

/// A message together with the tree index of its sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub from: NodeIndex,
    pub message: CosiMessage,
}

impl Envelope {
    pub fn new(from: NodeIndex, message: CosiMessage) -> Self {
        Self { from, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_and_phase_tags() {
        let announce = CosiMessage::Announcement(Announcement {
            round: Round::Commit,
        });
        assert_eq!(announce.round(), Round::Commit);
        assert_eq!(announce.phase(), Phase::Announcement);

        let response = CosiMessage::Response(ResponseMessage {
            round: Round::Prepare,
            response: None,
            exceptions: vec![],
        });
        assert_eq!(response.round(), Round::Prepare);
        assert_eq!(response.phase(), Phase::Response);
    }
}
