//! Node configuration.
//!
//! Settings a consensus node is started with. Loaded from TOML; every field
//! is optional and falls back to [`NodeConfig::default`]. Durations use
//! human-readable strings such as `"150ms"`.

use std::{collections::BTreeMap, path::Path, time::Duration};

use meshforge_proto::NodeId;
use serde::{Deserialize, Serialize};

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this structure
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are individually valid but inconsistent
    #[error("invalid config: {reason}")]
    Invalid {
        /// What is wrong
        reason: String,
    },
}

/// Configuration of a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// This node's identifier
    pub node_id: NodeId,
    /// Identifiers of the other nodes in the cluster
    pub peers: Vec<NodeId>,
    /// Where the node keeps persistent state
    pub data_dir: String,
    /// How long a follower waits before starting an election
    #[serde(with = "humantime_serde")]
    pub election_timeout: Duration,
    /// How often a leader signals liveness
    #[serde(with = "humantime_serde")]
    pub heartbeat_interval: Duration,
    /// Listen address, passed through to the consensus layer
    pub listen_addr: String,
    /// Consensus algorithm name
    pub algorithm: String,
    /// Algorithm-specific settings
    pub settings: BTreeMap<String, toml::Value>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            peers: Vec::new(),
            data_dir: "./data".to_string(),
            election_timeout: Duration::from_millis(150),
            heartbeat_interval: Duration::from_millis(50),
            listen_addr: ":8080".to_string(),
            algorithm: "raft".to_string(),
            settings: BTreeMap::new(),
        }
    }
}

impl NodeConfig {
    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&data)?;
        tracing::debug!(path = %path.as_ref().display(), node_id = %config.node_id, "loaded node config");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(invalid("node_id must not be empty"));
        }

        let mut seen = std::collections::BTreeSet::new();
        for peer in &self.peers {
            if peer == &self.node_id {
                return Err(invalid(format!("node {peer} lists itself as a peer")));
            }
            if !seen.insert(peer) {
                return Err(invalid(format!("duplicate peer {peer}")));
            }
        }

        if self.heartbeat_interval >= self.election_timeout {
            return Err(invalid(format!(
                "heartbeat_interval ({:?}) must be shorter than election_timeout ({:?})",
                self.heartbeat_interval, self.election_timeout
            )));
        }

        Ok(())
    }

    /// This node followed by its peers.
    pub fn cluster(&self) -> impl Iterator<Item = &NodeId> {
        std::iter::once(&self.node_id).chain(self.peers.iter())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { reason: reason.into() }
}
