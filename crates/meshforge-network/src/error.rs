//! Registry error types.

use meshforge_core::TransportError;
use meshforge_proto::NodeId;

use crate::conditions::ConditionsError;

/// Errors from [`NetworkManager`](crate::NetworkManager) operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    /// No transport is registered under this ID
    #[error("node {node_id} not found")]
    NodeNotFound {
        /// The unknown node
        node_id: NodeId,
    },

    /// A transport operation failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Link conditions are out of range
    #[error("invalid network conditions: {0}")]
    InvalidConditions(#[from] ConditionsError),
}

impl NetworkError {
    /// Whether this error means a node ID is unknown, at either the registry
    /// or the transport level.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound { .. } | Self::Transport(TransportError::NodeNotFound { .. })
        )
    }
}
