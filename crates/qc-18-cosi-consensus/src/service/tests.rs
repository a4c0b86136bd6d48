use super::*;
use crate::adapters::{SchnorrSigner, SchnorrVerifier};
use crate::domain::TransportError;
use shared_crypto::CosiKeyPair;
use shared_types::{build_block, build_header, build_transaction_list, Transaction};
use tokio::sync::mpsc;

// Mock transport that records every outbound message
struct RecordingTransport {
    index: NodeIndex,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    identities: Vec<CosiPublicKey>,
    sent: parking_lot::Mutex<Vec<(NodeIndex, CosiMessage)>>,
}

impl RecordingTransport {
    fn new(index: NodeIndex, parent: Option<NodeIndex>, children: Vec<NodeIndex>, size: u64) -> Self {
        Self {
            index,
            parent,
            children,
            identities: (0..size).map(|i| CosiKeyPair::from_seed(i).public_key()).collect(),
            sent: parking_lot::Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<(NodeIndex, CosiMessage)> {
        self.sent.lock().clone()
    }

    fn last_sent(&self) -> Option<(NodeIndex, CosiMessage)> {
        self.sent.lock().last().cloned()
    }
}

#[async_trait]
impl TreeTransport for RecordingTransport {
    fn index(&self) -> NodeIndex {
        self.index
    }

    fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    fn public_key(&self) -> CosiPublicKey {
        self.identities[self.index]
    }

    fn all_identities(&self) -> Vec<CosiPublicKey> {
        self.identities.clone()
    }

    async fn send_to(&self, to: NodeIndex, message: CosiMessage) -> Result<(), TransportError> {
        if to >= self.identities.len() {
            return Err(TransportError::UnknownNode(to));
        }
        self.sent.lock().push((to, message));
        Ok(())
    }
}

type TestNode = CosiNode<RecordingTransport, SchnorrSigner, SchnorrVerifier>;

fn signer(transport: &RecordingTransport) -> SchnorrSigner {
    SchnorrSigner::for_tree(
        CosiKeyPair::from_seed(transport.index as u64),
        &transport.identities,
    )
}

fn create_node(transport: Arc<RecordingTransport>, pool: Arc<TransactionPool>, tip: ChainTip) -> TestNode {
    CosiNode::new(CosiDependencies {
        prepare_signer: signer(&transport),
        commit_signer: signer(&transport),
        transport,
        verifier: Arc::new(SchnorrVerifier),
        pool,
        chain_tip: tip,
        config: CosiConfig::default(),
    })
}

fn create_leaf(tip: ChainTip) -> (Arc<RecordingTransport>, TestNode) {
    let transport = Arc::new(RecordingTransport::new(1, Some(0), vec![], 2));
    let node = create_node(Arc::clone(&transport), Arc::new(TransactionPool::new()), tip);
    (transport, node)
}

fn sample_block(tip: &ChainTip) -> Block {
    let pool: Vec<_> = (0u8..3).map(|i| Transaction::new(vec![i; 4])).collect();
    let list = build_transaction_list(&pool, 3);
    let header = build_header(&list, tip.last_block, tip.last_key_block);
    build_block(list, header)
}

fn from_parent(message: CosiMessage) -> Envelope {
    Envelope::new(0, message)
}

fn announcement(round: Round) -> CosiMessage {
    CosiMessage::Announcement(Announcement { round })
}

fn sent_commitment(transport: &RecordingTransport, round: Round) -> Commitment {
    transport
        .sent()
        .into_iter()
        .find_map(|(_, message)| match message {
            CosiMessage::Commitment(c) if c.round == round => Some(c.commitment),
            _ => None,
        })
        .expect("commitment was sent")
}

fn last_response(transport: &RecordingTransport) -> ResponseMessage {
    match transport.last_sent() {
        Some((0, CosiMessage::Response(response))) => response,
        other => panic!("expected a response to the parent, got {other:?}"),
    }
}

#[tokio::test]
async fn test_leaf_answers_announcement_with_commitment() {
    let (transport, mut node) = create_leaf(ChainTip::default());

    node.handle(from_parent(announcement(Round::Prepare)))
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        &sent[0],
        (0, CosiMessage::Commitment(CommitmentMessage { round: Round::Prepare, .. }))
    ));
}

#[tokio::test]
async fn test_internal_node_waits_for_every_child() {
    let transport = Arc::new(RecordingTransport::new(1, Some(0), vec![2, 3], 4));
    let mut node = create_node(
        Arc::clone(&transport),
        Arc::new(TransactionPool::new()),
        ChainTip::default(),
    );

    node.handle(from_parent(announcement(Round::Commit)))
        .await
        .unwrap();
    let forwarded: Vec<_> = transport.sent().into_iter().map(|(to, _)| to).collect();
    assert_eq!(forwarded, vec![2, 3]);

    let child_commitment = |seed| {
        let identities = transport.identities.clone();
        let mut child = SchnorrSigner::for_tree(CosiKeyPair::from_seed(seed), &identities);
        CosiMessage::Commitment(CommitmentMessage {
            round: Round::Commit,
            commitment: child.commit(&[]),
        })
    };

    node.handle(Envelope::new(2, child_commitment(2))).await.unwrap();
    assert_eq!(transport.sent().len(), 2);

    node.handle(Envelope::new(3, child_commitment(3))).await.unwrap();
    assert!(matches!(
        transport.last_sent(),
        Some((0, CosiMessage::Commitment(CommitmentMessage { round: Round::Commit, .. })))
    ));

    let extra = node.handle(Envelope::new(3, child_commitment(3))).await;
    assert!(matches!(
        extra,
        Err(CosiError::UnexpectedContribution { round: Round::Commit, .. })
    ));
}

#[tokio::test]
async fn test_message_from_non_neighbour_is_rejected() {
    let (_transport, mut node) = create_leaf(ChainTip::default());

    let result = node
        .handle(Envelope::new(5, announcement(Round::Prepare)))
        .await;
    assert!(matches!(
        result,
        Err(CosiError::UnexpectedSender { from: 5, .. })
    ));
}

#[tokio::test]
async fn test_root_with_empty_pool_cannot_propose() {
    let transport = Arc::new(RecordingTransport::new(0, None, vec![1], 2));
    let mut node = create_node(
        Arc::clone(&transport),
        Arc::new(TransactionPool::new()),
        ChainTip::default(),
    );

    node.start().await.unwrap();
    assert_eq!(transport.sent().len(), 2);

    let mut child = SchnorrSigner::for_tree(CosiKeyPair::from_seed(1), &transport.identities);
    let result = node
        .handle(Envelope::new(
            1,
            CosiMessage::Commitment(CommitmentMessage {
                round: Round::Prepare,
                commitment: child.commit(&[]),
            }),
        ))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, CosiError::NoTransactionsAvailable));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_leaf_with_foreign_block_contributes_exception() {
    let (transport, mut node) = create_leaf(ChainTip::new([9; 32], [0; 32]));
    node.handle(from_parent(announcement(Round::Prepare)))
        .await
        .unwrap();

    let block = sample_block(&ChainTip::default());
    let mut root = SchnorrSigner::for_tree(CosiKeyPair::from_seed(0), &transport.identities);
    root.commit(&[sent_commitment(&transport, Round::Prepare)]);
    let challenge = root.create_challenge(&block.to_bytes().unwrap()).unwrap();

    node.handle(from_parent(CosiMessage::ChallengePrepare(ChallengePrepare {
        challenge,
        block,
    })))
    .await
    .unwrap();

    let response = last_response(&transport);
    assert_eq!(response.round, Round::Prepare);
    assert!(response.response.is_none());
    assert_eq!(response.exceptions.len(), 1);
    assert_eq!(response.exceptions[0].public_key, transport.identities[1]);
}

/// Drive a leaf through the prepare round and return the root-side signer
/// state needed to build a commit challenge.
async fn leaf_through_prepare() -> (Arc<RecordingTransport>, TestNode, Block, Option<CosiSignature>) {
    let (transport, mut node) = create_leaf(ChainTip::default());
    for round in Round::ALL {
        node.handle(from_parent(announcement(round))).await.unwrap();
    }

    let block = sample_block(&ChainTip::default());
    let message = block.to_bytes().unwrap();
    let mut root = SchnorrSigner::for_tree(CosiKeyPair::from_seed(0), &transport.identities);
    root.commit(&[sent_commitment(&transport, Round::Prepare)]);
    let challenge = root.create_challenge(&message).unwrap();

    node.handle(from_parent(CosiMessage::ChallengePrepare(ChallengePrepare {
        challenge,
        block: block.clone(),
    })))
    .await
    .unwrap();

    let leaf_response = last_response(&transport)
        .response
        .expect("honest leaf contributes a share");
    root.response(&[leaf_response]).unwrap();
    (transport, node, block, root.signature())
}

fn commit_challenge(transport: &RecordingTransport, block: &Block) -> shared_crypto::Challenge {
    let mut root = SchnorrSigner::for_tree(CosiKeyPair::from_seed(0), &transport.identities);
    root.commit(&[sent_commitment(transport, Round::Commit)]);
    root.create_challenge(&block.to_bytes().unwrap()).unwrap()
}

#[tokio::test]
async fn test_leaf_signs_commit_over_valid_prepare_certificate() {
    let (transport, mut node, block, prepare_signature) = leaf_through_prepare().await;
    assert!(prepare_signature.is_some());

    let challenge = commit_challenge(&transport, &block);
    node.handle(from_parent(CosiMessage::ChallengeCommit(ChallengeCommit {
        challenge,
        prepare_signature,
        exceptions: vec![],
    })))
    .await
    .unwrap();

    let response = last_response(&transport);
    assert_eq!(response.round, Round::Commit);
    assert!(response.response.is_some());
    assert!(response.exceptions.is_empty());
    assert!(!node.is_refusing());
    assert_eq!(node.outcome(), Some(&NodeOutcome::Participant { refused: false }));
}

#[tokio::test]
async fn test_leaf_refuses_commit_without_prepare_signature() {
    let (transport, mut node, block, _) = leaf_through_prepare().await;

    let challenge = commit_challenge(&transport, &block);
    node.handle(from_parent(CosiMessage::ChallengeCommit(ChallengeCommit {
        challenge,
        prepare_signature: None,
        exceptions: vec![],
    })))
    .await
    .unwrap();

    let response = last_response(&transport);
    assert!(response.response.is_none());
    assert_eq!(response.exceptions.len(), 1);
    assert_eq!(response.exceptions[0].public_key, transport.identities[1]);
    assert!(node.is_refusing());
    assert_eq!(node.outcome(), Some(&NodeOutcome::Participant { refused: true }));
}

#[tokio::test]
async fn test_leaf_refuses_commit_over_forged_prepare_signature() {
    let (transport, mut node, block, prepare_signature) = leaf_through_prepare().await;

    // A signature over a different block does not verify against this one.
    let mut other = block.clone();
    other.header.parent_hash = [7; 32];
    let forged_challenge = commit_challenge(&transport, &other);
    let forged = prepare_signature.map(|signature| CosiSignature {
        challenge: forged_challenge,
        ..signature
    });

    let challenge = commit_challenge(&transport, &block);
    node.handle(from_parent(CosiMessage::ChallengeCommit(ChallengeCommit {
        challenge,
        prepare_signature: forged,
        exceptions: vec![],
    })))
    .await
    .unwrap();

    assert!(node.is_refusing());
    assert!(last_response(&transport).response.is_none());
}

#[tokio::test]
async fn test_single_node_runs_whole_instance() {
    let transport = Arc::new(RecordingTransport::new(0, None, vec![], 1));
    let pool = Arc::new(TransactionPool::with_transactions(
        (0u8..3).map(|i| Transaction::new(vec![i])),
    ));
    let node = create_node(Arc::clone(&transport), Arc::clone(&pool), ChainTip::default());
    let aggregate = node.aggregate_public_key();

    let (_sender, inbox) = mpsc::unbounded_channel();
    let outcome = node.run(inbox).await.unwrap();

    let certificate = outcome.certificate().expect("root returns a certificate");
    assert_eq!(certificate.block.tx_count(), 3);
    assert!(certificate.verify(&aggregate).is_ok());
    assert!(pool.is_empty());
    assert!(transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_silent_child_times_out_instance() {
    let transport = Arc::new(RecordingTransport::new(0, None, vec![1], 2));
    let mut node = create_node(
        Arc::clone(&transport),
        Arc::new(TransactionPool::with_transactions([Transaction::new(b"tx".to_vec())])),
        ChainTip::default(),
    );
    node.config.round_timeout_ms = Some(50);

    let (_sender, inbox) = mpsc::unbounded_channel();
    let result = node.run(inbox).await;
    assert!(matches!(result, Err(CosiError::Timeout { after_ms: 50 })));
    assert!(transport.sent().len() >= 2);
}

#[tokio::test]
async fn test_inbox_closed_ends_instance() {
    let (_transport, node) = create_leaf(ChainTip::default());
    let (sender, inbox) = mpsc::unbounded_channel();
    drop(sender);
    assert!(matches!(node.run(inbox).await, Err(CosiError::InboxClosed)));
}

#[tokio::test]
async fn test_verification_timeout_counts_as_failure() {
    let (transport, mut node) = create_leaf(ChainTip::default());
    node.config.verification_timeout_ms = Some(1);
    node.config.simulated_latency_per_500kib_ms = Some(500);

    node.handle(from_parent(announcement(Round::Prepare)))
        .await
        .unwrap();

    let pool = vec![Transaction::new(vec![1u8; 600 * 1024])];
    let list = build_transaction_list(&pool, 1);
    let header = build_header(&list, [0; 32], [0; 32]);
    let block = build_block(list, header);

    let mut root = SchnorrSigner::for_tree(CosiKeyPair::from_seed(0), &transport.identities);
    root.commit(&[sent_commitment(&transport, Round::Prepare)]);
    let challenge = root.create_challenge(&block.to_bytes().unwrap()).unwrap();

    node.handle(from_parent(CosiMessage::ChallengePrepare(ChallengePrepare {
        challenge,
        block,
    })))
    .await
    .unwrap();

    let response = last_response(&transport);
    assert!(response.response.is_none());
    assert_eq!(response.exceptions.len(), 1);
}

#[test]
fn test_node_reports_tree_aggregate() {
    let (transport, node) = create_leaf(ChainTip::default());
    assert_eq!(
        node.aggregate_public_key(),
        CosiPublicKey::aggregate(&transport.identities)
    );
    assert_eq!(node.index(), 1);
    assert!(node.working_block().is_none());
    assert!(node.prepare_certificate().is_none());
}
