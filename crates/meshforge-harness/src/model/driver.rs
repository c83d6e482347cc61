//! Real mesh wrapper that mirrors [`ModelMesh`](super::ModelMesh)'s interface.

use std::{collections::BTreeMap, time::Duration};

use meshforge_core::{Message, MessageType, NodeId, Transport, TransportError};
use meshforge_network::{NetworkError, NetworkManager};

use super::{
    mesh::{NodeCounters, ObservableState},
    operation::{Operation, OperationError, OperationResult, node_id},
};
use crate::sim_env::SeededEnv;

/// Longer than the default link latency, so every delivery task has run.
const SETTLE: Duration = Duration::from_millis(2);

/// Drives a [`NetworkManager`] with model operations.
///
/// Each [`apply`](Self::apply) settles in-flight deliveries and drains every
/// inbox before returning, so the observable state never depends on timing.
/// Meant to run under a paused tokio clock.
#[derive(Debug)]
pub struct MeshDriver {
    manager: NetworkManager<SeededEnv>,
    delivered: BTreeMap<NodeId, u64>,
}

impl MeshDriver {
    /// Create an empty mesh.
    pub fn new(seed: u64) -> Self {
        Self {
            manager: NetworkManager::with_env(SeededEnv::with_seed(seed)),
            delivered: BTreeMap::new(),
        }
    }

    /// The mesh under test.
    pub fn manager(&self) -> &NetworkManager<SeededEnv> {
        &self.manager
    }

    /// Apply an operation, then wait for its deliveries.
    pub async fn apply(&mut self, op: &Operation) -> OperationResult {
        let result = self.dispatch(op);
        tokio::time::sleep(SETTLE).await;
        self.drain();
        result
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let mut state = ObservableState::default();
        for (id, stats) in self.manager.stats() {
            let Ok(transport) = self.manager.get_node(&id) else {
                continue;
            };
            if transport.is_closed() {
                state.closed.insert(id.clone());
            }
            let counters = NodeCounters {
                delivered: self.delivered.get(&id).copied().unwrap_or(0),
                sent: stats.messages_sent,
                dropped: stats.messages_dropped,
            };
            state.nodes.insert(id, counters);
        }
        state
    }

    fn dispatch(&mut self, op: &Operation) -> OperationResult {
        let outcome = match op {
            Operation::CreateNode { node } => {
                let id = node_id(*node);
                self.delivered.insert(id.clone(), 0);
                self.manager.create_node(id);
                Ok(())
            },
            Operation::RemoveNode { node } => {
                let id = node_id(*node);
                self.delivered.remove(&id);
                self.manager.remove_node(&id)
            },
            Operation::CloseNode { node } => {
                self.manager.get_node(&node_id(*node)).and_then(|t| t.close().map_err(Into::into))
            },
            Operation::Send { from, to, payload } => {
                let (from, to) = (node_id(*from), node_id(*to));
                let message =
                    Message::new(MessageType::ClientRequest, from.clone(), to.clone(), vec![*payload]);
                self.manager.get_node(&from).and_then(|t| t.send(&to, message).map_err(Into::into))
            },
            Operation::Broadcast { from } => {
                let from = node_id(*from);
                let message = Message::new(MessageType::Heartbeat, from.clone(), "", Vec::new());
                self.manager.get_node(&from).and_then(|t| t.broadcast(message).map_err(Into::into))
            },
            Operation::Partition { node } => {
                self.manager.partition(&[node_id(*node)]);
                Ok(())
            },
            Operation::Heal { node } => {
                self.manager.heal(&[node_id(*node)]);
                Ok(())
            },
            Operation::ClearPartitions => {
                self.manager.clear_partitions();
                Ok(())
            },
        };

        match outcome {
            Ok(()) => OperationResult::Ok,
            Err(NetworkError::Transport(TransportError::Closed)) => {
                OperationResult::Error(OperationError::TransportClosed)
            },
            Err(e) if e.is_not_found() => OperationResult::Error(OperationError::NodeNotFound),
            Err(e) => {
                tracing::warn!(error = %e, ?op, "unexpected mesh error");
                OperationResult::Error(OperationError::Unexpected)
            },
        }
    }

    fn drain(&mut self) {
        for (id, count) in &mut self.delivered {
            if let Ok(transport) = self.manager.get_node(id) {
                *count += transport.receive().drain().len() as u64;
            }
        }
    }
}
