//! Round engine
//!
//! Buffers the contributions of a node's children for one round and folds
//! them into the node's own signing state once every child has reported.
//! Buffering counts messages, so a child that forwards no response share
//! still completes its slot.

use crate::domain::{CosiError, CosiResult, ExceptionList, Phase, ResponseMessage, Round, RoundCertificate};
use crate::ports::CosiSigner;
use shared_crypto::{Challenge, Commitment, CryptoError, Exception, Response};

/// Whether a buffer has heard from every child yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Aggregation<T> {
    Pending { received: usize, expected: usize },
    Ready(T),
}

pub struct RoundState<S> {
    round: Round,
    signer: S,
    expected_children: usize,
    commitments: Vec<Commitment>,
    responses: Vec<Response>,
    responses_received: usize,
    exceptions: ExceptionList,
    commitment_sent: bool,
    response_sent: bool,
}

impl<S: CosiSigner> RoundState<S> {
    pub fn new(round: Round, signer: S, expected_children: usize) -> Self {
        Self {
            round,
            signer,
            expected_children,
            commitments: Vec::with_capacity(expected_children),
            responses: Vec::with_capacity(expected_children),
            responses_received: 0,
            exceptions: ExceptionList::new(),
            commitment_sent: false,
            response_sent: false,
        }
    }

    pub fn round(&self) -> Round {
        self.round
    }

    fn unexpected(&self, phase: Phase) -> CosiError {
        CosiError::UnexpectedContribution {
            round: self.round,
            phase,
            expected: self.expected_children,
        }
    }

    /// Leaf entry point: commit with no children.
    pub fn originate_commitment(&mut self) -> CosiResult<Commitment> {
        if self.commitment_sent {
            return Err(self.unexpected(Phase::Commitment));
        }
        self.commitment_sent = true;
        Ok(self.signer.commit(&[]))
    }

    /// Buffer a child's aggregate commitment.
    ///
    /// Ready once every child has committed; the buffer is then folded into
    /// this node's own commitment and cleared.
    pub fn receive_commitment(&mut self, commitment: Commitment) -> CosiResult<Aggregation<Commitment>> {
        if self.commitment_sent || self.commitments.len() >= self.expected_children {
            return Err(self.unexpected(Phase::Commitment));
        }
        self.commitments.push(commitment);

        if self.commitments.len() < self.expected_children {
            return Ok(Aggregation::Pending {
                received: self.commitments.len(),
                expected: self.expected_children,
            });
        }

        let aggregate = self.signer.commit(&self.commitments);
        self.commitments.clear();
        self.commitment_sent = true;
        Ok(Aggregation::Ready(aggregate))
    }

    /// Root only.
    pub fn create_challenge(&mut self, message: &[u8]) -> CosiResult<Challenge> {
        Ok(self.signer.create_challenge(message)?)
    }

    pub fn accept_challenge(&mut self, challenge: &Challenge) -> Challenge {
        self.signer.challenge(challenge)
    }

    /// Buffer a child's response message and merge its exceptions.
    pub fn receive_response(&mut self, message: ResponseMessage) -> CosiResult<Aggregation<()>> {
        if self.response_sent || self.responses_received >= self.expected_children {
            return Err(self.unexpected(Phase::Response));
        }
        self.responses_received += 1;
        self.responses.extend(message.response);
        self.exceptions.extend(message.exceptions);

        if self.responses_received < self.expected_children {
            return Ok(Aggregation::Pending {
                received: self.responses_received,
                expected: self.expected_children,
            });
        }
        Ok(Aggregation::Ready(()))
    }

    /// Fold the buffered child responses into this node's contribution.
    ///
    /// With `vouch` the node adds its own share. Otherwise it adds an
    /// exception for itself and forwards only its children's shares.
    pub fn contribute(&mut self, vouch: bool) -> CosiResult<ResponseMessage> {
        if self.response_sent || self.responses_received < self.expected_children {
            return Err(self.unexpected(Phase::Response));
        }

        let response = if vouch {
            Some(self.signer.response(&self.responses)?)
        } else {
            let commitment = self
                .signer
                .commitment()
                .ok_or(CryptoError::MissingCommitment)?;
            self.exceptions.insert(Exception {
                public_key: self.signer.public_key(),
                commitment,
            });
            self.signer.response_excluding_own(&self.responses)
        };

        self.responses.clear();
        self.response_sent = true;
        Ok(ResponseMessage {
            round: self.round,
            response,
            exceptions: self.exceptions.to_vec(),
        })
    }

    pub fn exceptions(&self) -> &ExceptionList {
        &self.exceptions
    }

    /// Signature and exceptions as they stand; complete at the root once
    /// [`contribute`](Self::contribute) has run.
    pub fn certificate(&self) -> RoundCertificate {
        RoundCertificate {
            round: self.round,
            signature: self.signer.signature(),
            exceptions: self.exceptions.to_vec(),
        }
    }
}
