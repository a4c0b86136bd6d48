//! Ports for the collective signing subsystem
//!
//! - Inbound (driving): [`MessageHandler`], implemented by the node
//! - Outbound (driven): the signing primitive, signature verification and
//!   the tree transport

pub mod inbound;
pub mod outbound;

pub use inbound::MessageHandler;
pub use outbound::{CosiSigner, CosiVerifier, TreeTransport};

pub use crate::domain::{NodeIndex, TransportError};
