//! Delivery statistics.
//!
//! Counters are updated by a transport (and its delivery tasks) as a side
//! effect of send attempts. Readers always get a detached copy.
//!
//! # Populated fields
//!
//! Only `messages_sent`, `messages_dropped`, `messages_duplicated`,
//! `messages_corrupted` and the per-peer `sent` counter are ever incremented.
//! `messages_received`, `average_latency` and the per-peer `received` and
//! `dropped` counters exist for consumers that fill them in themselves and
//! stay zero here.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use meshforge_proto::NodeId;

/// Counters for one peer, as seen by the node holding the stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    /// Messages delivered to this peer
    pub sent: u64,
    /// Messages received from this peer
    pub received: u64,
    /// Messages to this peer that were dropped
    pub dropped: u64,
}

/// Aggregate counters of one transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    /// Messages enqueued at their destination
    pub messages_sent: u64,
    /// Messages taken from this node's queue
    pub messages_received: u64,
    /// Messages lost to loss sampling, partitions or full/closed queues
    pub messages_dropped: u64,
    /// Extra copies enqueued by duplication
    pub messages_duplicated: u64,
    /// Messages whose payload was replaced
    pub messages_corrupted: u64,
    /// Mean delivery latency
    pub average_latency: Duration,
    /// Per-peer counters keyed by peer ID
    pub node_stats: HashMap<NodeId, NodeStats>,
}

/// Shared, lock-guarded accumulator.
///
/// Cloned into every delivery task of a transport so that counters keep
/// updating after `send` has returned.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatsRecorder {
    inner: Arc<Mutex<NetworkStats>>,
}

impl StatsRecorder {
    fn update(&self, f: impl FnOnce(&mut NetworkStats)) {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner));
    }

    pub(crate) fn record_sent(&self, to: &str) {
        self.update(|stats| {
            stats.messages_sent += 1;
            stats.node_stats.entry(to.to_string()).or_default().sent += 1;
        });
    }

    pub(crate) fn record_dropped(&self) {
        self.update(|stats| stats.messages_dropped += 1);
    }

    pub(crate) fn record_duplicated(&self) {
        self.update(|stats| stats.messages_duplicated += 1);
    }

    pub(crate) fn record_corrupted(&self) {
        self.update(|stats| stats.messages_corrupted += 1);
    }

    /// Deep copy of the current counters.
    pub(crate) fn snapshot(&self) -> NetworkStats {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the counters with a zeroed set.
    pub(crate) fn reset(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = NetworkStats::default();
    }
}
