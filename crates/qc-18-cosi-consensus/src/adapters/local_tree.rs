//! In-process tree transport
//!
//! Every node gets an unbounded inbox. Node `i > 0` hangs under
//! `(i - 1) / fanout`, so node `0` is the root and the tree is complete
//! level by level. Nodes can be disconnected to simulate crashes.

use crate::domain::{CosiMessage, Envelope, NodeIndex, TransportError};
use crate::ports::TreeTransport;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_crypto::CosiPublicKey;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

struct Links {
    senders: Vec<UnboundedSender<Envelope>>,
    disconnected: RwLock<HashSet<NodeIndex>>,
}

/// A complete `fanout`-ary tree of in-process nodes.
pub struct LocalTree {
    identities: Arc<Vec<CosiPublicKey>>,
    fanout: usize,
    links: Arc<Links>,
    inboxes: Vec<Option<UnboundedReceiver<Envelope>>>,
}

impl LocalTree {
    /// Lay out `identities` breadth first. A fanout of `0` is treated as `1`.
    pub fn new(identities: Vec<CosiPublicKey>, fanout: usize) -> Self {
        let (senders, inboxes): (Vec<_>, Vec<_>) = identities
            .iter()
            .map(|_| {
                let (tx, rx) = mpsc::unbounded_channel();
                (tx, Some(rx))
            })
            .unzip();

        Self {
            identities: Arc::new(identities),
            fanout: fanout.max(1),
            links: Arc::new(Links {
                senders,
                disconnected: RwLock::new(HashSet::new()),
            }),
            inboxes,
        }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn parent_of(&self, index: NodeIndex) -> Option<NodeIndex> {
        (index > 0).then(|| (index - 1) / self.fanout)
    }

    pub fn children_of(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let first = index * self.fanout + 1;
        (first..first + self.fanout)
            .take_while(|child| *child < self.len())
            .collect()
    }

    pub fn aggregate_public_key(&self) -> CosiPublicKey {
        CosiPublicKey::aggregate(self.identities.iter())
    }

    /// Transport handle for the node at `index`.
    pub fn node(&self, index: NodeIndex) -> Option<LocalTreeNode> {
        (index < self.len()).then(|| LocalTreeNode {
            index,
            parent: self.parent_of(index),
            children: self.children_of(index),
            identities: Arc::clone(&self.identities),
            links: Arc::clone(&self.links),
        })
    }

    /// Inbox of the node at `index`. Each inbox can be taken once.
    pub fn take_inbox(&mut self, index: NodeIndex) -> Option<UnboundedReceiver<Envelope>> {
        self.inboxes.get_mut(index).and_then(Option::take)
    }

    /// Cut every link to and from `index`.
    pub fn disconnect(&self, index: NodeIndex) {
        self.links.disconnected.write().insert(index);
    }
}

/// One node's view of a [`LocalTree`].
#[derive(Clone)]
pub struct LocalTreeNode {
    index: NodeIndex,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    identities: Arc<Vec<CosiPublicKey>>,
    links: Arc<Links>,
}

#[async_trait]
impl TreeTransport for LocalTreeNode {
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
        self.identities.as_ref().clone()
    }

    async fn send_to(&self, to: NodeIndex, message: CosiMessage) -> Result<(), TransportError> {
        let sender = self
            .links
            .senders
            .get(to)
            .ok_or(TransportError::UnknownNode(to))?;

        {
            let disconnected = self.links.disconnected.read();
            if disconnected.contains(&to) || disconnected.contains(&self.index) {
                return Err(TransportError::LinkDown(to));
            }
        }

        trace!(from = self.index, to, phase = %message.phase(), round = %message.round(), "Delivering message");
        sender
            .send(Envelope::new(self.index, message))
            .map_err(|_| TransportError::LinkDown(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Announcement, Round, TreeRole};
    use shared_crypto::CosiKeyPair;

    fn identities(n: u64) -> Vec<CosiPublicKey> {
        (0..n).map(|i| CosiKeyPair::from_seed(i).public_key()).collect()
    }

    fn announce() -> CosiMessage {
        CosiMessage::Announcement(Announcement {
            round: Round::Prepare,
        })
    }

    #[test]
    fn test_binary_tree_shape() {
        let tree = LocalTree::new(identities(6), 2);
        assert_eq!(tree.parent_of(0), None);
        assert_eq!(tree.children_of(0), vec![1, 2]);
        assert_eq!(tree.children_of(1), vec![3, 4]);
        assert_eq!(tree.children_of(2), vec![5]);
        assert!(tree.children_of(3).is_empty());
        assert_eq!(tree.parent_of(5), Some(2));
        assert_eq!(tree.node(0).unwrap().role(), TreeRole::Root);
        assert_eq!(tree.node(1).unwrap().role(), TreeRole::Internal);
        assert_eq!(tree.node(5).unwrap().role(), TreeRole::Leaf);
    }

    #[test]
    fn test_fanout_one_is_a_chain() {
        let tree = LocalTree::new(identities(3), 0);
        assert_eq!(tree.children_of(0), vec![1]);
        assert_eq!(tree.children_of(1), vec![2]);
        assert!(tree.node(2).unwrap().is_leaf());
        assert!(tree.node(0).unwrap().is_root());
    }

    #[tokio::test]
    async fn test_send_reaches_inbox() {
        let mut tree = LocalTree::new(identities(3), 2);
        let mut inbox = tree.take_inbox(1).unwrap();
        let root = tree.node(0).unwrap();

        root.send_to(1, announce()).await.unwrap();
        let envelope = inbox.recv().await.unwrap();
        assert_eq!(envelope.from, 0);
        assert_eq!(envelope.message, announce());
        assert!(tree.take_inbox(1).is_none());
    }

    #[tokio::test]
    async fn test_disconnected_node_is_unreachable() {
        let tree = LocalTree::new(identities(3), 2);
        let root = tree.node(0).unwrap();
        let leaf = tree.node(2).unwrap();
        tree.disconnect(2);

        assert_eq!(root.send_to(2, announce()).await, Err(TransportError::LinkDown(2)));
        assert_eq!(leaf.send_to(0, announce()).await, Err(TransportError::LinkDown(0)));
        assert!(root.send_to(1, announce()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_node() {
        let tree = LocalTree::new(identities(2), 2);
        let root = tree.node(0).unwrap();
        assert_eq!(root.send_to(7, announce()).await, Err(TransportError::UnknownNode(7)));
        assert!(tree.node(2).is_none());
    }
}
