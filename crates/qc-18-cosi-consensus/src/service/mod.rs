//! Phase orchestrator
//!
//! [`CosiNode`] drives one signing instance at one tree position. It owns a
//! [`RoundState`] per round, routes each inbound message to the handler for
//! its round and phase, and connects the two rounds:
//!
//! ```text
//!   root: announce(prepare) ─┐        ┌─ announce(commit)
//!                            ▼        ▼
//!            prepare commitments    commit commitments
//!                     │                     │
//!      assemble block, challenge            │ (aggregated concurrently)
//!                     │                     │
//!         prepare responses ──done──► commit challenge (+ prepare certificate)
//!                                           │
//!                                    commit responses ──► BlockCertificate
//! ```
//!
//! Every node checks the proposed block on a background task and awaits the
//! result only when it builds its prepare response. On the commit challenge
//! every node checks the prepare certificate and refuses to sign when the
//! signature does not verify or too many nodes raised exceptions.

mod assembler;
mod cluster;
mod engine;
mod verifier;

#[cfg(test)]
mod tests;

pub use assembler::BlockAssembler;
pub use cluster::{ClusterReport, LocalCluster};
pub use engine::{Aggregation, RoundState};
pub use verifier::{spawn_verification, PendingVerification};

use crate::config::CosiConfig;
use crate::domain::{
    Announcement, BlockCertificate, ChainTip, ChallengeCommit, ChallengePrepare,
    CommitmentMessage, CosiError, CosiMessage, CosiResult, Envelope, ExceptionList, NodeIndex,
    NodeOutcome, ResponseMessage, Round, RoundCertificate, TransactionPool,
};
use crate::metrics;
use crate::ports::{CosiSigner, CosiVerifier, MessageHandler, TreeTransport};
use async_trait::async_trait;
use shared_crypto::{Commitment, CosiPublicKey, CosiSignature, Exception};
use shared_types::Block;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Dependencies for CosiNode
pub struct CosiDependencies<T, S, V> {
    pub transport: Arc<T>,
    /// Fresh signer for the prepare round.
    pub prepare_signer: S,
    /// Fresh signer for the commit round.
    pub commit_signer: S,
    pub verifier: Arc<V>,
    /// Only read at the root.
    pub pool: Arc<TransactionPool>,
    pub chain_tip: ChainTip,
    pub config: CosiConfig,
}

/// One node's participation in a signing instance.
pub struct CosiNode<T, S, V>
where
    T: TreeTransport,
    S: CosiSigner,
    V: CosiVerifier,
{
    transport: Arc<T>,
    verifier: Arc<V>,
    assembler: BlockAssembler,
    config: CosiConfig,
    chain_tip: ChainTip,
    aggregate_public: CosiPublicKey,
    node_count: usize,
    prepare: RoundState<S>,
    commit: RoundState<S>,
    working_block: Option<Block>,
    verification: Option<PendingVerification>,
    prepare_certificate: Option<RoundCertificate>,
    prepare_done: Option<oneshot::Sender<()>>,
    prepare_signal: Option<oneshot::Receiver<()>>,
    commit_challenge_pending: bool,
    refuse_to_sign: bool,
    outcome: Option<NodeOutcome>,
}

impl<T, S, V> CosiNode<T, S, V>
where
    T: TreeTransport,
    S: CosiSigner,
    V: CosiVerifier,
{
    pub fn new(deps: CosiDependencies<T, S, V>) -> Self {
        let identities = deps.transport.all_identities();
        let children = deps.transport.children().len();
        let (prepare_done, prepare_signal) = oneshot::channel();

        Self {
            aggregate_public: CosiPublicKey::aggregate(&identities),
            node_count: identities.len(),
            prepare: RoundState::new(Round::Prepare, deps.prepare_signer, children),
            commit: RoundState::new(Round::Commit, deps.commit_signer, children),
            transport: deps.transport,
            verifier: deps.verifier,
            assembler: BlockAssembler::new(deps.pool),
            config: deps.config,
            chain_tip: deps.chain_tip,
            working_block: None,
            verification: None,
            prepare_certificate: None,
            prepare_done: Some(prepare_done),
            prepare_signal: Some(prepare_signal),
            commit_challenge_pending: false,
            refuse_to_sign: false,
            outcome: None,
        }
    }

    pub fn index(&self) -> NodeIndex {
        self.transport.index()
    }

    pub fn aggregate_public_key(&self) -> CosiPublicKey {
        self.aggregate_public
    }

    /// Whether this node will contribute an exception to the commit round.
    pub fn is_refusing(&self) -> bool {
        self.refuse_to_sign
    }

    pub fn working_block(&self) -> Option<&Block> {
        self.working_block.as_ref()
    }

    /// Set at the root once the prepare round is complete.
    pub fn prepare_certificate(&self) -> Option<&RoundCertificate> {
        self.prepare_certificate.as_ref()
    }

    pub fn outcome(&self) -> Option<&NodeOutcome> {
        self.outcome.as_ref()
    }

    /// Root only: open both rounds. A no-op elsewhere.
    pub async fn start(&mut self) -> CosiResult<()> {
        if !self.transport.is_root() {
            return Ok(());
        }
        info!(
            node = self.index(),
            nodes = self.node_count,
            "Starting signing instance"
        );
        for round in Round::ALL {
            self.announce(round).await?;
        }
        Ok(())
    }

    /// Process the inbox until this node's part of the instance is done.
    ///
    /// The root returns its [`BlockCertificate`]; other nodes return once
    /// they have sent their commit response.
    pub async fn run(mut self, mut inbox: UnboundedReceiver<Envelope>) -> CosiResult<NodeOutcome> {
        let timeout = self.config.round_timeout();
        let deadline = timeout.map(|t| Instant::now() + t);

        debug!(
            node = self.index(),
            role = %self.transport.role(),
            children = self.transport.children().len(),
            "Joining signing instance"
        );
        if let Err(e) = self.start().await {
            self.triage(e)?;
        }

        loop {
            if let Some(outcome) = self.outcome.take() {
                return Ok(outcome);
            }

            let commit_gate = self.commit_challenge_pending;
            tokio::select! {
                _ = expire(deadline) => {
                    let after_ms = timeout.map(|t| t.as_millis() as u64).unwrap_or_default();
                    warn!(node = self.index(), after_ms, "Signing instance timed out");
                    return Err(CosiError::Timeout { after_ms });
                }
                signal = prepare_signal(&mut self.prepare_signal), if commit_gate => {
                    self.prepare_signal = None;
                    let started = match signal {
                        Ok(()) => self.start_commit_challenge().await,
                        Err(_) => Err(CosiError::PrepareIncomplete),
                    };
                    if let Err(e) = started {
                        self.triage(e)?;
                    }
                }
                received = inbox.recv() => match received {
                    Some(envelope) => {
                        if let Err(e) = self.handle(envelope).await {
                            self.triage(e)?;
                        }
                    }
                    None => return Err(CosiError::InboxClosed),
                }
            }
        }
    }

    fn triage(&self, error: CosiError) -> CosiResult<()> {
        if error.is_fatal() {
            error!(node = self.index(), error = %error, "Signing instance aborted");
            return Err(error);
        }
        warn!(node = self.index(), error = %error, "Message handling failed");
        Ok(())
    }

    fn round_mut(&mut self, round: Round) -> &mut RoundState<S> {
        match round {
            Round::Prepare => &mut self.prepare,
            Round::Commit => &mut self.commit,
        }
    }

    async fn broadcast(&self, message: CosiMessage) {
        for &child in self.transport.children() {
            if let Err(e) = self.transport.send_to(child, message.clone()).await {
                warn!(
                    node = self.index(),
                    child,
                    phase = %message.phase(),
                    round = %message.round(),
                    error = %e,
                    "Failed to reach child"
                );
            }
        }
    }

    async fn send_to_parent(&self, message: CosiMessage) -> CosiResult<()> {
        if let Some(parent) = self.transport.parent() {
            self.transport.send_to(parent, message).await?;
        }
        Ok(())
    }

    // === ANNOUNCEMENT / COMMITMENT ===

    async fn announce(&mut self, round: Round) -> CosiResult<()> {
        if self.transport.is_leaf() {
            let commitment = self.round_mut(round).originate_commitment()?;
            return self.commitment_ready(round, commitment).await;
        }
        self.broadcast(CosiMessage::Announcement(Announcement { round }))
            .await;
        Ok(())
    }

    async fn handle_commitment(&mut self, message: CommitmentMessage) -> CosiResult<()> {
        match self
            .round_mut(message.round)
            .receive_commitment(message.commitment)?
        {
            Aggregation::Pending { received, expected } => {
                trace!(node = self.index(), round = %message.round, received, expected, "Buffered commitment");
                Ok(())
            }
            Aggregation::Ready(aggregate) => self.commitment_ready(message.round, aggregate).await,
        }
    }

    async fn commitment_ready(&mut self, round: Round, aggregate: Commitment) -> CosiResult<()> {
        if !self.transport.is_root() {
            return self
                .send_to_parent(CosiMessage::Commitment(CommitmentMessage {
                    round,
                    commitment: aggregate,
                }))
                .await;
        }

        match round {
            Round::Prepare => self.start_prepare_challenge().await,
            Round::Commit => {
                debug!(node = self.index(), "Commit commitments aggregated; waiting for prepare round");
                self.commit_challenge_pending = true;
                Ok(())
            }
        }
    }

    // === PREPARE ROUND ===

    async fn start_prepare_challenge(&mut self) -> CosiResult<()> {
        let block = self
            .assembler
            .assemble(self.config.block_size, &self.chain_tip)?;
        let message = block.to_bytes()?;
        let challenge = self.prepare.create_challenge(&message)?;

        info!(
            node = self.index(),
            tx_count = block.tx_count(),
            size = message.len(),
            "Proposing block"
        );
        self.begin_verification(&block);
        self.working_block = Some(block.clone());

        if self.transport.is_leaf() {
            return self.contribute_prepare().await;
        }
        self.broadcast(CosiMessage::ChallengePrepare(ChallengePrepare { challenge, block }))
            .await;
        Ok(())
    }

    async fn handle_prepare_challenge(&mut self, message: ChallengePrepare) -> CosiResult<()> {
        let challenge = self.prepare.accept_challenge(&message.challenge);
        self.begin_verification(&message.block);
        self.working_block = Some(message.block.clone());

        if self.transport.is_leaf() {
            return self.contribute_prepare().await;
        }
        self.broadcast(CosiMessage::ChallengePrepare(ChallengePrepare {
            challenge,
            block: message.block,
        }))
        .await;
        Ok(())
    }

    fn begin_verification(&mut self, block: &Block) {
        self.verification = Some(spawn_verification(
            block.clone(),
            self.chain_tip,
            self.config.simulated_latency(),
        ));
    }

    async fn await_verification(&mut self) -> bool {
        let Some(pending) = self.verification.take() else {
            warn!(node = self.index(), "No block verification in flight");
            return false;
        };
        match pending.outcome(self.config.verification_timeout()).await {
            Ok(verified) => verified,
            Err(e) => {
                error!(node = self.index(), error = %e, "Block verification lost");
                false
            }
        }
    }

    async fn contribute_prepare(&mut self) -> CosiResult<()> {
        let verified = self.await_verification().await;
        if !verified {
            warn!(node = self.index(), "Block failed verification; contributing prepare exception");
            metrics::record_exception(Round::Prepare.as_str());
        }

        let response = self.prepare.contribute(verified)?;
        if self.transport.is_root() {
            self.finish_prepare();
            return Ok(());
        }
        self.send_to_parent(CosiMessage::Response(response)).await
    }

    fn finish_prepare(&mut self) {
        let certificate = self.prepare.certificate();
        info!(
            node = self.index(),
            signed = certificate.is_signed(),
            exceptions = certificate.exceptions.len(),
            "Prepare round complete"
        );
        metrics::record_round_completed(Round::Prepare.as_str());
        self.prepare_certificate = Some(certificate);

        if let Some(done) = self.prepare_done.take() {
            if done.send(()).is_err() {
                debug!(node = self.index(), "Prepare completion no longer awaited");
            }
        }
    }

    // === COMMIT ROUND ===

    async fn start_commit_challenge(&mut self) -> CosiResult<()> {
        self.commit_challenge_pending = false;
        let certificate = self
            .prepare_certificate
            .clone()
            .ok_or(CosiError::PrepareIncomplete)?;
        let message = self
            .working_block
            .as_ref()
            .ok_or(CosiError::MissingWorkingBlock(Round::Commit))?
            .to_bytes()?;
        let challenge = self.commit.create_challenge(&message)?;

        self.evaluate_prepare(&message, certificate.signature.as_ref(), &certificate.exceptions);

        if self.transport.is_leaf() {
            return self.contribute_commit().await;
        }
        self.broadcast(CosiMessage::ChallengeCommit(ChallengeCommit {
            challenge,
            prepare_signature: certificate.signature,
            exceptions: certificate.exceptions,
        }))
        .await;
        Ok(())
    }

    async fn handle_commit_challenge(&mut self, message: ChallengeCommit) -> CosiResult<()> {
        let challenge = self.commit.accept_challenge(&message.challenge);

        let encoded = self.working_block.as_ref().map(Block::to_bytes);
        match encoded {
            Some(Ok(bytes)) => {
                self.evaluate_prepare(&bytes, message.prepare_signature.as_ref(), &message.exceptions)
            }
            Some(Err(e)) => {
                warn!(node = self.index(), error = %e, "Cannot encode prepare block; refusing to sign commit");
                self.refuse_to_sign = true;
            }
            None => {
                warn!(node = self.index(), "Commit challenge without a prepare block; refusing to sign commit");
                self.refuse_to_sign = true;
            }
        }

        if self.transport.is_leaf() {
            return self.contribute_commit().await;
        }
        self.broadcast(CosiMessage::ChallengeCommit(ChallengeCommit {
            challenge,
            ..message
        }))
        .await;
        Ok(())
    }

    /// Decide whether the prepare certificate is good enough to build on.
    fn evaluate_prepare(
        &mut self,
        message: &[u8],
        signature: Option<&CosiSignature>,
        exceptions: &[Exception],
    ) {
        let node = self.index();
        match signature {
            Some(signature) => {
                if let Err(e) = self.verifier.verify_with_exceptions(
                    &self.aggregate_public,
                    message,
                    signature,
                    exceptions,
                ) {
                    warn!(node, error = %e, "Prepare signature rejected; refusing to sign commit");
                    self.refuse_to_sign = true;
                }
            }
            None => {
                warn!(node, "Prepare round produced no signature; refusing to sign commit");
                self.refuse_to_sign = true;
            }
        }

        let unique = exceptions.iter().copied().collect::<ExceptionList>().len();
        let policy = self.config.fault_tolerance;
        if policy.exceeded(unique, self.node_count) {
            error!(
                node,
                exceptions = unique,
                nodes = self.node_count,
                tolerated = policy.tolerated_faults(self.node_count),
                "Too many prepare exceptions; refusing to sign commit"
            );
            metrics::record_threshold_abort();
            self.refuse_to_sign = true;
        }
    }

    async fn contribute_commit(&mut self) -> CosiResult<()> {
        let vouch = !self.refuse_to_sign;
        if !vouch {
            metrics::record_exception(Round::Commit.as_str());
        }

        let response = self.commit.contribute(vouch)?;
        if self.transport.is_root() {
            return self.finish_commit();
        }

        let sent = self.send_to_parent(CosiMessage::Response(response)).await;
        self.outcome = Some(NodeOutcome::Participant {
            refused: self.refuse_to_sign,
        });
        sent
    }

    fn finish_commit(&mut self) -> CosiResult<()> {
        let block = self
            .working_block
            .clone()
            .ok_or(CosiError::MissingWorkingBlock(Round::Commit))?;
        let prepare = self
            .prepare_certificate
            .clone()
            .ok_or(CosiError::PrepareIncomplete)?;
        let commit = self.commit.certificate();

        info!(
            node = self.index(),
            tx_count = block.tx_count(),
            prepare_exceptions = prepare.exceptions.len(),
            commit_exceptions = commit.exceptions.len(),
            signed = commit.is_signed(),
            "Commit round complete"
        );
        metrics::record_round_completed(Round::Commit.as_str());

        self.outcome = Some(NodeOutcome::Root(BlockCertificate {
            block,
            prepare,
            commit,
        }));
        Ok(())
    }

    // === RESPONSES ===

    async fn handle_response(&mut self, message: ResponseMessage) -> CosiResult<()> {
        let round = message.round;
        match self.round_mut(round).receive_response(message)? {
            Aggregation::Pending { received, expected } => {
                trace!(node = self.index(), round = %round, received, expected, "Buffered response");
                Ok(())
            }
            Aggregation::Ready(()) => match round {
                Round::Prepare => self.contribute_prepare().await,
                Round::Commit => self.contribute_commit().await,
            },
        }
    }
}

#[async_trait]
impl<T, S, V> MessageHandler for CosiNode<T, S, V>
where
    T: TreeTransport,
    S: CosiSigner,
    V: CosiVerifier,
{
    async fn handle(&mut self, envelope: Envelope) -> CosiResult<()> {
        let phase = envelope.message.phase();
        let from_neighbour = if phase.travels_down() {
            self.transport.parent() == Some(envelope.from)
        } else {
            self.transport.children().contains(&envelope.from)
        };
        if !from_neighbour {
            return Err(CosiError::UnexpectedSender {
                from: envelope.from,
                phase,
            });
        }

        trace!(
            node = self.index(),
            from = envelope.from,
            phase = %phase,
            round = %envelope.message.round(),
            "Handling message"
        );

        match envelope.message {
            CosiMessage::Announcement(message) => self.announce(message.round).await,
            CosiMessage::Commitment(message) => self.handle_commitment(message).await,
            CosiMessage::ChallengePrepare(message) => self.handle_prepare_challenge(message).await,
            CosiMessage::ChallengeCommit(message) => self.handle_commit_challenge(message).await,
            CosiMessage::Response(message) => self.handle_response(message).await,
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn prepare_signal(
    signal: &mut Option<oneshot::Receiver<()>>,
) -> Result<(), oneshot::error::RecvError> {
    match signal {
        Some(receiver) => receiver.await,
        None => std::future::pending().await,
    }
}
