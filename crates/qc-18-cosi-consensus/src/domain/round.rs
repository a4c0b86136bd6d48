//! Rounds and phases of a signing instance

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two collective signatures produced per block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Round {
    /// Nodes vouch that the block is well formed.
    Prepare,
    /// Nodes vouch that enough peers vouched in the prepare round.
    Commit,
}

impl Round {
    pub const ALL: [Round; 2] = [Round::Prepare, Round::Commit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Round::Prepare => "prepare",
            Round::Commit => "commit",
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step within a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Announcement,
    Commitment,
    Challenge,
    Response,
}

impl Phase {
    /// Announcements and challenges travel root to leaves.
    pub fn travels_down(&self) -> bool {
        matches!(self, Phase::Announcement | Phase::Challenge)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Announcement => "announcement",
            Phase::Commitment => "commitment",
            Phase::Challenge => "challenge",
            Phase::Response => "response",
        })
    }
}

/// Position of a node in the signing tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeRole {
    /// No parent. A single-node tree's root is also a leaf.
    Root,
    Internal,
    Leaf,
}

impl TreeRole {
    pub fn of(has_parent: bool, child_count: usize) -> Self {
        match (has_parent, child_count) {
            (false, _) => TreeRole::Root,
            (true, 0) => TreeRole::Leaf,
            (true, _) => TreeRole::Internal,
        }
    }
}

impl fmt::Display for TreeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TreeRole::Root => "root",
            TreeRole::Internal => "internal",
            TreeRole::Leaf => "leaf",
        })
    }
}
