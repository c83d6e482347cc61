//! Protocol messages.

use std::time::SystemTime;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Opaque identifier of a logical node.
pub type NodeId = String;

/// Kind of a consensus message.
///
/// Covers the Raft and Paxos exchanges plus a few generic kinds. Serialized
/// as its `u8` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum MessageType {
    /// Raft log replication
    AppendEntries = 0,
    /// Raft election request
    RequestVote = 1,
    /// Reply to `AppendEntries`
    AppendEntriesResponse = 2,
    /// Reply to `RequestVote`
    RequestVoteResponse = 3,
    /// Paxos phase 1a
    Prepare = 4,
    /// Paxos phase 1b
    Promise = 5,
    /// Paxos phase 2a
    Accept = 6,
    /// Paxos phase 2b
    Accepted = 7,
    /// Liveness signal
    Heartbeat = 8,
    /// Request forwarded from a client
    ClientRequest = 9,
}

/// Byte did not name a [`MessageType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid message type: {0}")]
pub struct InvalidMessageType(pub u8);

impl TryFrom<u8> for MessageType {
    type Error = InvalidMessageType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AppendEntries),
            1 => Ok(Self::RequestVote),
            2 => Ok(Self::AppendEntriesResponse),
            3 => Ok(Self::RequestVoteResponse),
            4 => Ok(Self::Prepare),
            5 => Ok(Self::Promise),
            6 => Ok(Self::Accept),
            7 => Ok(Self::Accepted),
            8 => Ok(Self::Heartbeat),
            9 => Ok(Self::ClientRequest),
            other => Err(InvalidMessageType(other)),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        kind as Self
    }
}

/// A message exchanged between two nodes.
///
/// `to` is empty for messages addressed to every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message kind
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Sending node
    pub from: NodeId,
    /// Receiving node (empty for broadcasts)
    pub to: NodeId,
    /// Protocol term or ballot
    #[serde(default)]
    pub term: u64,
    /// Opaque protocol payload
    #[serde(default, rename = "data")]
    pub payload: Bytes,
    /// When the sender created the message
    pub timestamp: SystemTime,
}

impl Message {
    /// Create a message stamped with the current wall-clock time and term 0.
    pub fn new(
        kind: MessageType,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            kind,
            from: from.into(),
            to: to.into(),
            term: 0,
            payload: payload.into(),
            timestamp: SystemTime::now(),
        }
    }

    /// Set the term.
    #[must_use]
    pub fn with_term(mut self, term: u64) -> Self {
        self.term = term;
        self
    }

    /// Whether the message is addressed to every node.
    pub fn is_broadcast(&self) -> bool {
        self.to.is_empty()
    }
}
