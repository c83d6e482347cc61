//! Node registry.
//!
//! Owns every [`MemoryTransport`] of the mesh and is the only writer of the
//! membership. After each topology change it builds a fresh [`Membership`]
//! snapshot and installs it in every surviving transport before returning,
//! so no node ever sees a half-applied change.
//!
//! ## Lock order
//!
//! Registry lock, then a transport's state lock. Transports never call back
//! into the registry.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use meshforge_core::{Environment, Transport};
use meshforge_proto::NodeId;

use crate::{
    conditions::NetworkConditions,
    error::NetworkError,
    membership::Membership,
    memory::{DEFAULT_INBOX_CAPACITY, MemoryTransport, NetworkTransport},
    stats::NetworkStats,
    system_env::SystemEnv,
};

#[derive(Debug)]
struct Registry<E: Environment> {
    transports: BTreeMap<NodeId, Arc<MemoryTransport<E>>>,
    /// Mesh-wide partitioned side, applied to every transport
    partitions: BTreeSet<NodeId>,
}

impl<E: Environment> Default for Registry<E> {
    fn default() -> Self {
        Self { transports: BTreeMap::new(), partitions: BTreeSet::new() }
    }
}

impl<E: Environment> Registry<E> {
    /// Install the current membership in every transport.
    fn rewire(&self) {
        let membership: Membership = self
            .transports
            .iter()
            .map(|(id, transport)| (id.clone(), transport.mailbox()))
            .collect();

        for transport in self.transports.values() {
            transport.connect(membership.clone());
        }
    }

    fn partition_list(&self) -> Vec<NodeId> {
        self.partitions.iter().cloned().collect()
    }
}

/// Registry wiring every node into a fully connected mesh.
///
/// # Type Parameters
///
/// - `E`: Environment handed to every transport it creates
#[derive(Debug)]
pub struct NetworkManager<E: Environment = SystemEnv> {
    env: E,
    inbox_capacity: usize,
    registry: RwLock<Registry<E>>,
}

impl NetworkManager {
    /// Create an empty registry using the system environment.
    pub fn new() -> Self {
        Self::with_env(SystemEnv::new())
    }
}

impl Default for NetworkManager {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Environment> NetworkManager<E> {
    /// Create an empty registry.
    pub fn with_env(env: E) -> Self {
        Self::with_capacity(env, DEFAULT_INBOX_CAPACITY)
    }

    /// Create an empty registry whose transports buffer `inbox_capacity`
    /// inbound messages each.
    pub fn with_capacity(env: E, inbox_capacity: usize) -> Self {
        Self { env, inbox_capacity, registry: RwLock::new(Registry::default()) }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry<E>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry<E>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a node and connect it to every existing node.
    ///
    /// Creating an ID that already exists replaces its transport; the
    /// displaced transport is closed.
    pub fn create_node(&self, node_id: impl Into<NodeId>) -> Arc<MemoryTransport<E>> {
        let node_id = node_id.into();
        let transport = Arc::new(MemoryTransport::with_capacity(
            node_id.clone(),
            self.env.clone(),
            self.inbox_capacity,
        ));

        let mut registry = self.write();
        transport.create_partition(&registry.partition_list());

        if let Some(displaced) = registry.transports.insert(node_id.clone(), Arc::clone(&transport))
        {
            tracing::warn!(node_id = %node_id, "replacing existing node");
            displaced.shut_down();
        }
        registry.rewire();

        tracing::debug!(node_id = %node_id, nodes = registry.transports.len(), "node created");
        transport
    }

    /// Close a node and disconnect it from the mesh.
    pub fn remove_node(&self, node_id: &str) -> Result<(), NetworkError> {
        let mut registry = self.write();
        let transport = registry
            .transports
            .remove(node_id)
            .ok_or_else(|| NetworkError::NodeNotFound { node_id: node_id.to_string() })?;

        transport.close()?;
        registry.rewire();

        tracing::debug!(node_id, nodes = registry.transports.len(), "node removed");
        Ok(())
    }

    /// Look up a node's transport.
    pub fn get_node(&self, node_id: &str) -> Result<Arc<MemoryTransport<E>>, NetworkError> {
        self.read()
            .transports
            .get(node_id)
            .cloned()
            .ok_or_else(|| NetworkError::NodeNotFound { node_id: node_id.to_string() })
    }

    /// IDs of every registered node.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.read().transports.keys().cloned().collect()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.read().transports.len()
    }

    /// Whether no node is registered.
    pub fn is_empty(&self) -> bool {
        self.read().transports.is_empty()
    }

    /// Close every node and forget them. Idempotent.
    pub fn shutdown(&self) -> Result<(), NetworkError> {
        let mut registry = self.write();
        for transport in registry.transports.values() {
            transport.close()?;
        }

        let closed = registry.transports.len();
        *registry = Registry::default();

        tracing::info!(nodes = closed, "network shut down");
        Ok(())
    }

    /// Move nodes to the partitioned side on every transport, including
    /// transports created later.
    pub fn partition(&self, nodes: &[NodeId]) {
        let mut registry = self.write();
        registry.partitions.extend(nodes.iter().cloned());
        for transport in registry.transports.values() {
            transport.create_partition(nodes);
        }
        tracing::info!(?nodes, "partition created");
    }

    /// Return nodes to the unpartitioned side on every transport.
    pub fn heal(&self, nodes: &[NodeId]) {
        let mut registry = self.write();
        for node in nodes {
            registry.partitions.remove(node);
        }
        for transport in registry.transports.values() {
            transport.remove_partition(nodes);
        }
        tracing::info!(?nodes, "partition healed");
    }

    /// Remove every partition on every transport.
    pub fn clear_partitions(&self) {
        let mut registry = self.write();
        registry.partitions.clear();
        for transport in registry.transports.values() {
            transport.clear_partitions();
        }
        tracing::info!("partitions cleared");
    }

    /// Nodes currently on the partitioned side.
    pub fn partitioned_nodes(&self) -> Vec<NodeId> {
        self.read().partition_list()
    }

    /// Install the policy of link `(from, to)` on the sending node.
    pub fn set_link_conditions(
        &self,
        from: &str,
        to: &str,
        conditions: NetworkConditions,
    ) -> Result<(), NetworkError> {
        conditions.validate()?;
        self.get_node(from)?.set_conditions(from, to, conditions);
        Ok(())
    }

    /// Install the same policy on every link between current nodes.
    pub fn set_all_conditions(&self, conditions: &NetworkConditions) -> Result<(), NetworkError> {
        conditions.validate()?;

        let registry = self.read();
        for (from, transport) in &registry.transports {
            for to in registry.transports.keys().filter(|to| *to != from) {
                transport.set_conditions(from, to, conditions.clone());
            }
        }
        Ok(())
    }

    /// Counters of every node.
    pub fn stats(&self) -> BTreeMap<NodeId, NetworkStats> {
        self.read()
            .transports
            .iter()
            .map(|(id, transport)| (id.clone(), transport.stats()))
            .collect()
    }

    /// Zero the counters of every node.
    pub fn reset_stats(&self) {
        for transport in self.read().transports.values() {
            transport.reset_stats();
        }
    }
}
