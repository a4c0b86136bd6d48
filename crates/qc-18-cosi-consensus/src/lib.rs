//! # qc-18-cosi-consensus
//!
//! Byzantine fault tolerant block signing over a tree of nodes.
//!
//! ## Architecture
//!
//! Each block is certified by two collective Schnorr signatures, produced
//! by two rounds that run over the same tree:
//!
//! - **Prepare**: every node checks the proposed block against its own
//!   chain tip and either adds its response share or an exception.
//! - **Commit**: every node checks the prepare signature and the number of
//!   prepare exceptions, and refuses to sign when more than the tolerated
//!   number of nodes (derived from `⌈N/3⌉`) raised one.
//!
//! Each round runs announce → commit → challenge → respond. Messages flow
//! down the tree for announcements and challenges, and up for commitments
//! and responses, which every internal node aggregates before forwarding:
//!
//! ```text
//!              root (0)          ── assembles block, creates challenges
//!             /        \
//!          (1)          (2)      ── aggregate children, add own share
//!         /   \        /
//!       (3)   (4)    (5)         ── leaves originate commitments
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qc_18_cosi_consensus::{ChainTip, CosiConfig, LocalCluster, TransactionPool};
//!
//! let cluster = LocalCluster::seeded(7, 2)
//!     .with_config(CosiConfig::default())
//!     .with_pool(pool);
//!
//! let report = cluster.run_instance().await?;
//! report.certificate.verify(&cluster.aggregate_public_key())?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

/// Default maximum number of transactions per block
pub const DEFAULT_BLOCK_SIZE: usize = 10;

// Re-export main types
pub use adapters::{LocalTree, LocalTreeNode, SchnorrSigner, SchnorrVerifier};
pub use config::CosiConfig;
pub use domain::{
    byzantine_threshold, BlockCertificate, ChainTip, CosiError, CosiMessage, CosiResult,
    Envelope, ExceptionList, FaultTolerance, NodeIndex, NodeOutcome, Round, RoundCertificate,
    TransactionPool, TransportError, TreeRole,
};
pub use ports::{CosiSigner, CosiVerifier, MessageHandler, TreeTransport};
pub use service::{
    BlockAssembler, ClusterReport, CosiDependencies, CosiNode, LocalCluster, RoundState,
};
