//! Domain layer for collective block signing
//!
//! Pure types and rules: rounds, protocol messages, the exception set, the
//! Byzantine threshold, the pending transaction pool and the certificates a
//! completed instance produces. Nothing here touches the network.

pub mod certificate;
pub mod chain;
pub mod error;
pub mod exception;
pub mod messages;
pub mod pool;
pub mod round;
pub mod threshold;

pub use certificate::{BlockCertificate, NodeOutcome, RoundCertificate};
pub use chain::ChainTip;
pub use error::{CosiError, CosiResult, TransportError};
pub use exception::ExceptionList;
pub use messages::{
    Announcement, ChallengeCommit, ChallengePrepare, CommitmentMessage, CosiMessage, Envelope,
    NodeIndex, ResponseMessage,
};
pub use pool::TransactionPool;
pub use round::{Phase, Round, TreeRole};
pub use threshold::{byzantine_threshold, FaultTolerance};
