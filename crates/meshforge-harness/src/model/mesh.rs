//! Model mesh - the reference implementation.
//!
//! Tracks which nodes exist, which are closed and which are partitioned, and
//! derives from that alone where every message must end up. Links are
//! assumed loss-free with room in every inbox, so each send has exactly one
//! outcome: delivered, or dropped at the sender.

use std::collections::{BTreeMap, BTreeSet};

use meshforge_core::NodeId;

use super::operation::{NodeIndex, Operation, OperationError, OperationResult, node_id};

/// Per-node counters compared between model and real mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCounters {
    /// Messages this node has received
    pub delivered: u64,
    /// Messages this node's transport enqueued at a destination
    pub sent: u64,
    /// Messages this node's transport dropped
    pub dropped: u64,
}

/// Observable state for oracle comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableState {
    /// Counters of every registered node
    pub nodes: BTreeMap<NodeId, NodeCounters>,
    /// Closed nodes that are still registered
    pub closed: BTreeSet<NodeId>,
}

#[derive(Debug, Clone, Default)]
struct ModelNode {
    closed: bool,
    counters: NodeCounters,
}

/// Reference model of a [`NetworkManager`](meshforge_network::NetworkManager).
#[derive(Debug, Clone, Default)]
pub struct ModelMesh {
    nodes: BTreeMap<NodeId, ModelNode>,
    /// Partitioned side, including nodes that do not exist yet
    partitioned: BTreeSet<NodeId>,
}

impl ModelMesh {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::CreateNode { node } => {
                // Replacement starts from a fresh transport
                self.nodes.insert(node_id(*node), ModelNode::default());
                OperationResult::Ok
            },
            Operation::RemoveNode { node } => match self.nodes.remove(&node_id(*node)) {
                Some(_) => OperationResult::Ok,
                None => OperationResult::Error(OperationError::NodeNotFound),
            },
            Operation::CloseNode { node } => match self.nodes.get_mut(&node_id(*node)) {
                Some(state) => {
                    state.closed = true;
                    OperationResult::Ok
                },
                None => OperationResult::Error(OperationError::NodeNotFound),
            },
            Operation::Send { from, to, .. } => self.apply_send(*from, *to),
            Operation::Broadcast { from } => self.apply_broadcast(*from),
            Operation::Partition { node } => {
                self.partitioned.insert(node_id(*node));
                OperationResult::Ok
            },
            Operation::Heal { node } => {
                self.partitioned.remove(&node_id(*node));
                OperationResult::Ok
            },
            Operation::ClearPartitions => {
                self.partitioned.clear();
                OperationResult::Ok
            },
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            nodes: self.nodes.iter().map(|(id, node)| (id.clone(), node.counters)).collect(),
            closed: self
                .nodes
                .iter()
                .filter(|(_, node)| node.closed)
                .map(|(id, _)| id.clone())
                .collect(),
        }
    }

    fn check_sender(&self, from: &NodeId) -> Result<(), OperationError> {
        match self.nodes.get(from) {
            None => Err(OperationError::NodeNotFound),
            Some(node) if node.closed => Err(OperationError::TransportClosed),
            Some(_) => Ok(()),
        }
    }

    fn apply_send(&mut self, from: NodeIndex, to: NodeIndex) -> OperationResult {
        let (from, to) = (node_id(from), node_id(to));
        if let Err(e) = self.check_sender(&from) {
            return OperationResult::Error(e);
        }
        if !self.nodes.contains_key(&to) {
            return OperationResult::Error(OperationError::NodeNotFound);
        }

        self.route(&from, &to);
        OperationResult::Ok
    }

    fn apply_broadcast(&mut self, from: NodeIndex) -> OperationResult {
        let from = node_id(from);
        if let Err(e) = self.check_sender(&from) {
            return OperationResult::Error(e);
        }

        let peers: Vec<_> = self.nodes.keys().filter(|id| **id != from).cloned().collect();
        for to in &peers {
            self.route(&from, to);
        }
        OperationResult::Ok
    }

    /// Settle one message from a live sender to a registered destination.
    fn route(&mut self, from: &NodeId, to: &NodeId) {
        let cut = self.partitioned.contains(from) != self.partitioned.contains(to);
        let reachable = !cut && self.nodes.get(to).is_some_and(|node| !node.closed);

        if reachable {
            if let Some(node) = self.nodes.get_mut(to) {
                node.counters.delivered += 1;
            }
        }
        if let Some(node) = self.nodes.get_mut(from) {
            if reachable {
                node.counters.sent += 1;
            } else {
                node.counters.dropped += 1;
            }
        }
    }
}
