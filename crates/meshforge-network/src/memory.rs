//! In-memory transport with fault injection.
//!
//! One [`MemoryTransport`] per logical node. A send runs through:
//!
//! ```text
//! send(to, msg)
//!   ├─ closed?                    → Err(Closed)
//!   ├─ to not in membership?      → Err(NodeNotFound)
//!   ├─ partition sides differ?    → drop (no random draws)
//!   ├─ draw < packet_loss?        → drop
//!   └─ spawn delivery task, return Ok
//!        ├─ sleep base_latency + uniform[0, jitter)
//!        ├─ draw < duplication?   → replace payload, count corrupted
//!        ├─ offer to destination  → sent (per-peer sent) | dropped
//!        └─ draw < duplication?   → offer a second copy → duplicated
//! ```
//!
//! Drops are never reported to the caller; they only show up in
//! [`NetworkStats`]. The delivery task is detached: `send` returns before the
//! message is delivered, and messages to the same destination may overtake
//! each other once jitter is involved.

use std::{
    collections::{HashMap, HashSet},
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use bytes::Bytes;
use meshforge_core::{Environment, Inbox, Mailbox, Transport, TransportError, bounded};
use meshforge_proto::{Message, NodeId};

use crate::{
    conditions::NetworkConditions, membership::Membership, stats::NetworkStats,
    stats::StatsRecorder, system_env::SystemEnv,
};

/// Inbound queue capacity of a transport unless configured otherwise.
pub const DEFAULT_INBOX_CAPACITY: usize = 1000;

/// Payload substituted into corrupted messages.
pub const CORRUPTED_PAYLOAD: &[u8] = b"corrupted";

/// Transport with link-level fault injection and partition control.
pub trait NetworkTransport: Transport {
    /// Install the policy for link `(from, to)`.
    fn set_conditions(&self, from: &str, to: &str, conditions: NetworkConditions);

    /// Policy for link `(from, to)`, or the default if none was installed.
    fn get_conditions(&self, from: &str, to: &str) -> NetworkConditions;

    /// Add nodes to the partitioned side.
    fn create_partition(&self, nodes: &[NodeId]);

    /// Return nodes to the unpartitioned side.
    fn remove_partition(&self, nodes: &[NodeId]);

    /// Return every node to the unpartitioned side.
    fn clear_partitions(&self);

    /// Copy of the current counters.
    fn stats(&self) -> NetworkStats;

    /// Zero all counters.
    fn reset_stats(&self);
}

/// Mutable routing state of a transport.
#[derive(Debug, Default)]
struct LinkState {
    /// Current view of the mesh
    peers: Membership,
    /// Link policies keyed by `(from, to)`
    conditions: HashMap<(NodeId, NodeId), NetworkConditions>,
    /// Nodes on the partitioned side
    partitions: HashSet<NodeId>,
    closed: bool,
}

impl LinkState {
    /// Partitioning is symmetric-exclusive: a link is cut when exactly one
    /// end is in the set.
    fn is_cut(&self, from: &str, to: &str) -> bool {
        self.partitions.contains(from) != self.partitions.contains(to)
    }
}

/// In-memory transport for one node.
///
/// # Type Parameters
///
/// - `E`: Environment used for fault sampling and delivery delays
#[derive(Debug)]
pub struct MemoryTransport<E: Environment = SystemEnv> {
    node_id: NodeId,
    env: E,
    mailbox: Mailbox,
    inbox: Inbox,
    state: RwLock<LinkState>,
    stats: StatsRecorder,
}

impl MemoryTransport {
    /// Create an unconnected transport using the system environment.
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self::with_env(node_id, SystemEnv::new())
    }
}

impl<E: Environment> MemoryTransport<E> {
    /// Create an unconnected transport.
    pub fn with_env(node_id: impl Into<NodeId>, env: E) -> Self {
        Self::with_capacity(node_id, env, DEFAULT_INBOX_CAPACITY)
    }

    /// Create an unconnected transport whose inbound queue holds `capacity`
    /// messages.
    pub fn with_capacity(node_id: impl Into<NodeId>, env: E, capacity: usize) -> Self {
        let (mailbox, inbox) = bounded(capacity);
        Self {
            node_id: node_id.into(),
            env,
            mailbox,
            inbox,
            state: RwLock::new(LinkState::default()),
            stats: StatsRecorder::default(),
        }
    }

    /// This node's ID.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Producing half of this node's inbound queue, for building a
    /// [`Membership`].
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Whether [`Transport::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.read_state().closed
    }

    /// Close the transport: later sends fail and the inbox ends once
    /// drained. Returns `false` if it was already closed.
    ///
    /// Infallible counterpart of [`Transport::close`].
    pub fn shut_down(&self) -> bool {
        let mut state = self.write_state();
        if state.closed {
            return false;
        }
        state.closed = true;
        self.mailbox.close();
        tracing::debug!(node_id = %self.node_id, "transport closed");
        true
    }

    /// IDs this transport can currently address, excluding itself.
    pub fn peer_ids(&self) -> Vec<NodeId> {
        self.read_state().peers.node_ids().filter(|id| **id != self.node_id).cloned().collect()
    }

    /// Install a new view of the mesh.
    ///
    /// Links to members without a policy get the default one. Policies for
    /// nodes that left are kept; they are unreachable anyway.
    pub fn connect(&self, membership: Membership) {
        let mut state = self.write_state();
        for peer in membership.node_ids().filter(|id| **id != self.node_id) {
            state
                .conditions
                .entry((self.node_id.clone(), peer.clone()))
                .or_insert_with(NetworkConditions::default);
        }
        tracing::trace!(node_id = %self.node_id, members = membership.len(), "membership installed");
        state.peers = membership;
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LinkState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LinkState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn drop_message(&self, to: &str, reason: &'static str) {
        self.stats.record_dropped();
        tracing::trace!(node_id = %self.node_id, to, reason, "dropping message");
    }
}

impl<E: Environment> Transport for MemoryTransport<E> {
    fn send(&self, to: &str, message: Message) -> Result<(), TransportError> {
        let (target, conditions) = {
            let state = self.read_state();
            if state.closed {
                return Err(TransportError::Closed);
            }

            let target = state
                .peers
                .get(to)
                .cloned()
                .ok_or_else(|| TransportError::NodeNotFound { node_id: to.to_string() })?;

            if state.is_cut(&self.node_id, to) {
                drop(state);
                self.drop_message(to, "partition");
                return Ok(());
            }

            let conditions = state
                .conditions
                .get(&(self.node_id.clone(), to.to_string()))
                .cloned()
                .unwrap_or_default();
            (target, conditions)
        };

        if self.env.random_unit() < conditions.packet_loss {
            self.drop_message(to, "packet loss");
            return Ok(());
        }

        let delay = conditions.base_latency + self.env.random_duration(conditions.latency_jitter);

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::RuntimeUnavailable)?;
        runtime.spawn(deliver(Delivery {
            env: self.env.clone(),
            target,
            to: to.to_string(),
            message,
            duplication: conditions.duplication,
            delay,
            stats: self.stats.clone(),
        }));
        tracing::trace!(node_id = %self.node_id, to, ?delay, "delivery scheduled");

        Ok(())
    }

    fn broadcast(&self, message: Message) -> Result<(), TransportError> {
        let peers = {
            let state = self.read_state();
            if state.closed {
                return Err(TransportError::Closed);
            }
            state.peers.node_ids().filter(|id| **id != self.node_id).cloned().collect::<Vec<_>>()
        };

        for peer in peers {
            self.send(&peer, message.clone())?;
        }
        Ok(())
    }

    fn receive(&self) -> Inbox {
        self.inbox.clone()
    }

    fn close(&self) -> Result<(), TransportError> {
        self.shut_down();
        Ok(())
    }
}

impl<E: Environment> NetworkTransport for MemoryTransport<E> {
    fn set_conditions(&self, from: &str, to: &str, conditions: NetworkConditions) {
        self.write_state().conditions.insert((from.to_string(), to.to_string()), conditions);
    }

    fn get_conditions(&self, from: &str, to: &str) -> NetworkConditions {
        self.read_state()
            .conditions
            .get(&(from.to_string(), to.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn create_partition(&self, nodes: &[NodeId]) {
        self.write_state().partitions.extend(nodes.iter().cloned());
    }

    fn remove_partition(&self, nodes: &[NodeId]) {
        let mut state = self.write_state();
        for node in nodes {
            state.partitions.remove(node);
        }
    }

    fn clear_partitions(&self) {
        self.write_state().partitions.clear();
    }

    fn stats(&self) -> NetworkStats {
        self.stats.snapshot()
    }

    fn reset_stats(&self) {
        self.stats.reset();
    }
}

/// Everything a detached delivery needs; nothing borrows the sender.
struct Delivery<E> {
    env: E,
    target: Mailbox,
    to: NodeId,
    message: Message,
    duplication: f64,
    delay: Duration,
    stats: StatsRecorder,
}

async fn deliver<E: Environment>(delivery: Delivery<E>) {
    let Delivery { env, target, to, mut message, duplication, delay, stats } = delivery;

    if !delay.is_zero() {
        env.sleep(delay).await;
    }

    if env.random_unit() < duplication {
        message.payload = Bytes::from_static(CORRUPTED_PAYLOAD);
        stats.record_corrupted();
    }

    match target.offer(message.clone()) {
        Ok(()) => stats.record_sent(&to),
        Err(reason) => {
            stats.record_dropped();
            tracing::trace!(to = %to, reason = %reason, "dropping message");
        },
    }

    if env.random_unit() < duplication && target.offer(message).is_ok() {
        stats.record_duplicated();
    }
}
