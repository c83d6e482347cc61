//! Transport abstraction.
//!
//! The surface a consensus node uses to talk to its peers. Implementations
//! decide how (and whether) a message reaches its destination; a successful
//! `send` only means the message was accepted, never that it was delivered.

use meshforge_proto::{Message, NodeId};

use crate::queue::Inbox;

/// Errors surfaced synchronously to a sender.
///
/// Loss, partitions and full queues are not errors: they are silent drops
/// visible only through statistics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport has been closed
    #[error("transport closed")]
    Closed,

    /// Destination is not part of the current membership
    #[error("node {node_id} not found")]
    NodeNotFound {
        /// The unknown node
        node_id: NodeId,
    },

    /// Delivery needs an async runtime and none is running on this thread
    #[error("no async runtime available to schedule delivery")]
    RuntimeUnavailable,
}

/// Message passing between nodes.
pub trait Transport: Send + Sync {
    /// Send a message to one node.
    fn send(&self, to: &str, message: Message) -> Result<(), TransportError>;

    /// Send a message to every other node.
    fn broadcast(&self, message: Message) -> Result<(), TransportError>;

    /// Handle to this node's inbound queue.
    fn receive(&self) -> Inbox;

    /// Stop sending and end the inbound stream. Idempotent.
    fn close(&self) -> Result<(), TransportError>;
}
