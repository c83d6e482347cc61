//! Simulation configuration.
//!
//! ```toml
//! seed = 42
//! rounds = 20
//! partition = ["node-3"]
//!
//! [node]
//! node_id = "node-1"
//! peers = ["node-2", "node-3"]
//! heartbeat_interval = "50ms"
//!
//! [conditions]
//! base_latency = "5ms"
//! latency_jitter = "2ms"
//! packet_loss = 0.05
//!
//! [[links]]
//! from = "node-1"
//! to = "node-3"
//! conditions = { packet_loss = 1.0 }
//! ```

use std::path::Path;

use meshforge_core::{ConfigError, NodeConfig, NodeId};
use meshforge_network::{DEFAULT_INBOX_CAPACITY, NetworkConditions};
use serde::{Deserialize, Serialize};

/// Conditions for one directed link, overriding the mesh default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkOverride {
    /// Sending node
    pub from: NodeId,
    /// Receiving node
    pub to: NodeId,
    /// Policy for this link
    #[serde(default)]
    pub conditions: NetworkConditions,
}

/// Everything a scenario run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of every fault decision
    pub seed: u64,
    /// Heartbeat rounds to run
    pub rounds: u32,
    /// Inbound queue capacity per node
    pub inbox_capacity: usize,
    /// Mesh membership (`node_id` plus `peers`) and timing
    pub node: NodeConfig,
    /// Default policy for every link
    pub conditions: NetworkConditions,
    /// Per-link overrides, applied after the default
    pub links: Vec<LinkOverride>,
    /// Nodes on the partitioned side
    pub partition: Vec<NodeId>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            rounds: 10,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            node: NodeConfig::default(),
            conditions: NetworkConditions::default(),
            links: Vec::new(),
            partition: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Default configuration for a mesh of `nodes` nodes named
    /// `node-1` .. `node-N`.
    pub fn with_nodes(nodes: usize) -> Self {
        let mut config = Self::default();
        config.set_node_count(nodes);
        config
    }

    /// Replace the membership with `node-1` .. `node-N`. Zero is raised to one.
    pub fn set_node_count(&mut self, nodes: usize) {
        self.node.node_id = "node-1".to_string();
        self.node.peers = (2..=nodes.max(1)).map(|i| format!("node-{i}")).collect();
    }

    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&data)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            nodes = config.node_ids().len(),
            seed = config.seed,
            "loaded simulation config"
        );
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Every node of the mesh, in configuration order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.node.cluster().cloned().collect()
    }

    /// Check that policies are in range and every referenced node exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.node.validate()?;
        self.conditions.validate().map_err(|e| ConfigError::Invalid { reason: e.to_string() })?;

        let nodes = self.node_ids();
        let known = |id: &NodeId| nodes.contains(id);

        for link in &self.links {
            if !known(&link.from) || !known(&link.to) {
                return Err(ConfigError::Invalid {
                    reason: format!("link {} -> {} names an unknown node", link.from, link.to),
                });
            }
            link.conditions.validate().map_err(|e| ConfigError::Invalid {
                reason: format!("link {} -> {}: {e}", link.from, link.to),
            })?;
        }

        if let Some(unknown) = self.partition.iter().find(|id| !known(id)) {
            return Err(ConfigError::Invalid {
                reason: format!("partition names unknown node {unknown}"),
            });
        }

        Ok(())
    }
}
