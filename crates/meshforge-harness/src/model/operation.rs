//! Operations for model-based testing.
//!
//! Operations represent all possible actions on a mesh. They are generated
//! randomly by proptest (or the fuzzer) and applied to both the model and
//! the real fabric.

use arbitrary::Arbitrary;
use meshforge_core::NodeId;

/// Node slot (reduced modulo [`MAX_NODES`]).
pub type NodeIndex = u8;

/// Number of distinct node IDs operations can name.
///
/// Kept small so that random sequences hit existing nodes often.
pub const MAX_NODES: u8 = 5;

/// ID of the node in a slot.
pub fn node_id(index: NodeIndex) -> NodeId {
    format!("node-{}", index % MAX_NODES)
}

/// Operations that can be applied to a mesh.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Create (or replace) a node.
    CreateNode {
        /// Node to create.
        node: NodeIndex,
    },

    /// Remove a node from the mesh.
    RemoveNode {
        /// Node to remove.
        node: NodeIndex,
    },

    /// Close a node's transport without removing it.
    CloseNode {
        /// Node to close.
        node: NodeIndex,
    },

    /// Send one message.
    Send {
        /// Sending node.
        from: NodeIndex,
        /// Destination node (may equal `from`).
        to: NodeIndex,
        /// Payload byte.
        payload: u8,
    },

    /// Send one message to every other node.
    Broadcast {
        /// Sending node.
        from: NodeIndex,
    },

    /// Move a node to the partitioned side.
    Partition {
        /// Node to isolate.
        node: NodeIndex,
    },

    /// Return a node to the unpartitioned side.
    Heal {
        /// Node to reconnect.
        node: NodeIndex,
    },

    /// Remove every partition.
    ClearPartitions,
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded.
    Ok,

    /// Operation failed with expected error.
    Error(OperationError),
}

/// Expected errors that can occur during operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Node is not registered.
    NodeNotFound,

    /// Sending node's transport is closed.
    TransportClosed,

    /// Mesh error the model never produces.
    Unexpected,
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_wrap_around() {
        assert_eq!(node_id(0), "node-0");
        assert_eq!(node_id(MAX_NODES), "node-0");
        assert_eq!(node_id(MAX_NODES + 2), "node-2");
    }

    #[test]
    fn arbitrary_builds_operations() {
        let bytes: Vec<u8> = (0..=255).collect();
        let mut unstructured = arbitrary::Unstructured::new(&bytes);

        let ops: Vec<Operation> = (0..16)
            .map(|_| Operation::arbitrary(&mut unstructured).expect("enough bytes"))
            .collect();

        assert_eq!(ops.len(), 16);
    }
}
