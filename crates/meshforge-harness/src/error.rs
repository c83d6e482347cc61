//! Harness error types.

use meshforge_core::{ConfigError, TransportError};
use meshforge_network::NetworkError;

/// Errors surfaced by the harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Configuration could not be loaded or is inconsistent
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The mesh rejected an operation
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// A scenario oracle rejected the outcome of a run
    #[error("oracle failed: {reason}")]
    Oracle {
        /// What the oracle found
        reason: String,
    },
}

impl From<TransportError> for HarnessError {
    fn from(err: TransportError) -> Self {
        Self::Network(NetworkError::Transport(err))
    }
}
