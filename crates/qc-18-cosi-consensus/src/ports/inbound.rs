//! Driving port: protocol message dispatch

use crate::domain::{CosiResult, Envelope};
use async_trait::async_trait;

/// Entry point for messages delivered to a node.
#[async_trait]
pub trait MessageHandler: Send {
    /// Route one inbound message to the handler for its phase and round.
    ///
    /// Errors are per message; the caller decides with
    /// [`CosiError::is_fatal`](crate::domain::CosiError::is_fatal) whether
    /// the instance can continue.
    async fn handle(&mut self, envelope: Envelope) -> CosiResult<()>;
}
