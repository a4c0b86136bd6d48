//! In-process signing cluster
//!
//! Wires one [`CosiNode`] per key pair onto a [`LocalTree`] and runs a
//! signing instance with every node on its own task. Used for simulations
//! and end-to-end tests.

use super::{CosiDependencies, CosiNode};
use crate::adapters::{LocalTree, SchnorrSigner, SchnorrVerifier};
use crate::config::CosiConfig;
use crate::domain::{
    BlockCertificate, ChainTip, CosiError, CosiResult, NodeIndex, NodeOutcome, TransactionPool,
    TransportError,
};
use shared_crypto::{CosiKeyPair, CosiPublicKey};
use shared_types::Block;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Result of one instance: the root's certificate and how every other node
/// finished.
#[derive(Debug)]
pub struct ClusterReport {
    pub certificate: BlockCertificate,
    pub participants: Vec<(NodeIndex, CosiResult<NodeOutcome>)>,
}

impl ClusterReport {
    /// Non-root nodes that contributed a commit exception.
    pub fn refused(&self) -> Vec<NodeIndex> {
        self.participants
            .iter()
            .filter_map(|(index, outcome)| match outcome {
                Ok(NodeOutcome::Participant { refused: true }) => Some(*index),
                _ => None,
            })
            .collect()
    }
}

pub struct LocalCluster {
    keys: Vec<CosiKeyPair>,
    fanout: usize,
    config: CosiConfig,
    pool: Arc<TransactionPool>,
    chain_tips: Vec<ChainTip>,
    disconnected: Vec<NodeIndex>,
}

impl LocalCluster {
    /// Node `i` signs with `keys[i]`; node `0` is the root.
    pub fn new(keys: Vec<CosiKeyPair>, fanout: usize) -> Self {
        let chain_tips = vec![ChainTip::default(); keys.len()];
        Self {
            keys,
            fanout,
            config: CosiConfig::default(),
            pool: Arc::new(TransactionPool::new()),
            chain_tips,
            disconnected: Vec::new(),
        }
    }

    /// `size` nodes with deterministic keys.
    pub fn seeded(size: usize, fanout: usize) -> Self {
        Self::new((0..size as u64).map(CosiKeyPair::from_seed).collect(), fanout)
    }

    pub fn with_config(mut self, config: CosiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_pool(mut self, pool: Arc<TransactionPool>) -> Self {
        self.pool = pool;
        self
    }

    /// Same chain tip on every node.
    pub fn with_chain_tip(mut self, tip: ChainTip) -> Self {
        self.chain_tips.iter_mut().for_each(|t| *t = tip);
        self
    }

    /// Chain tip of one node; nodes that disagree with the root refuse the
    /// prepare round.
    pub fn with_node_chain_tip(mut self, index: NodeIndex, tip: ChainTip) -> Self {
        if let Some(slot) = self.chain_tips.get_mut(index) {
            *slot = tip;
        }
        self
    }

    /// Cut a node off from the tree for every instance.
    pub fn with_disconnected(mut self, index: NodeIndex) -> Self {
        self.disconnected.push(index);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn pool(&self) -> &Arc<TransactionPool> {
        &self.pool
    }

    pub fn chain_tip(&self, index: NodeIndex) -> Option<ChainTip> {
        self.chain_tips.get(index).copied()
    }

    pub fn identities(&self) -> Vec<CosiPublicKey> {
        self.keys.iter().map(CosiKeyPair::public_key).collect()
    }

    pub fn aggregate_public_key(&self) -> CosiPublicKey {
        CosiPublicKey::aggregate(&self.identities())
    }

    /// Advance every node's chain tip past a certified block.
    pub fn accept(&mut self, block: &Block) {
        self.chain_tips.iter_mut().for_each(|tip| tip.accept(block));
    }

    /// Run one signing instance to completion.
    ///
    /// Fails with the root's error if the root cannot finish; the remaining
    /// nodes are then aborted.
    pub async fn run_instance(&self) -> CosiResult<ClusterReport> {
        let identities = self.identities();
        let mut tree = LocalTree::new(identities.clone(), self.fanout);
        for &index in &self.disconnected {
            tree.disconnect(index);
        }

        let verifier = Arc::new(SchnorrVerifier);
        let mut handles: Vec<JoinHandle<CosiResult<NodeOutcome>>> = Vec::with_capacity(self.len());
        for (index, keypair) in self.keys.iter().enumerate() {
            let transport = tree.node(index).ok_or(TransportError::UnknownNode(index))?;
            let inbox = tree
                .take_inbox(index)
                .ok_or(TransportError::UnknownNode(index))?;

            let node = CosiNode::new(CosiDependencies {
                transport: Arc::new(transport),
                prepare_signer: SchnorrSigner::for_tree(keypair.clone(), &identities),
                commit_signer: SchnorrSigner::for_tree(keypair.clone(), &identities),
                verifier: Arc::clone(&verifier),
                pool: Arc::clone(&self.pool),
                chain_tip: self.chain_tips[index],
                config: self.config.clone(),
            });
            handles.push(tokio::spawn(node.run(inbox)));
        }

        let mut handles = handles.into_iter();
        let root = handles
            .next()
            .ok_or_else(|| CosiError::TaskFailed("cluster has no nodes".to_string()))?;

        let certificate = match join(root).await {
            Ok(NodeOutcome::Root(certificate)) => certificate,
            Ok(NodeOutcome::Participant { .. }) => {
                handles.for_each(|handle| handle.abort());
                return Err(CosiError::TaskFailed("root finished as a participant".to_string()));
            }
            Err(e) => {
                handles.for_each(|handle| handle.abort());
                return Err(e);
            }
        };

        let mut participants = Vec::with_capacity(self.len().saturating_sub(1));
        for (offset, handle) in handles.enumerate() {
            participants.push((offset + 1, join(handle).await));
        }

        info!(
            nodes = self.len(),
            tx_count = certificate.block.tx_count(),
            remaining = self.pool.len(),
            "Cluster instance finished"
        );
        Ok(ClusterReport {
            certificate,
            participants,
        })
    }
}

async fn join(handle: JoinHandle<CosiResult<NodeOutcome>>) -> CosiResult<NodeOutcome> {
    handle
        .await
        .map_err(|e| CosiError::TaskFailed(e.to_string()))?
}
