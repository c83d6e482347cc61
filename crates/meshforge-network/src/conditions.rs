//! Per-link fault policy.

use std::time::Duration;

use meshforge_proto::NodeId;
use serde::{Deserialize, Serialize};

/// Why a [`NetworkConditions`] was rejected.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConditionsError {
    /// A probability field is NaN or outside `[0, 1]`
    #[error("{field} must be in [0, 1], got {value}")]
    ProbabilityOutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: f64,
    },
}

/// Behaviour of one directed link `(from, to)`.
///
/// Pure data: the transport samples it once per send.
///
/// # Inert fields
///
/// - `duplication` gates BOTH payload corruption and the extra duplicate
///   copy, each with an independent draw.
/// - `corruption` and `bandwidth` are carried for configuration compatibility
///   and have no effect on delivery.
/// - `partitioned` and `partition_nodes` are informational; reachability is
///   decided by each transport's partition set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConditions {
    /// Added to every accepted message before delivery
    #[serde(with = "humantime_serde")]
    pub base_latency: Duration,
    /// Upper bound (exclusive) of the uniform extra delay per message
    #[serde(with = "humantime_serde")]
    pub latency_jitter: Duration,
    /// Probability in `[0, 1]` that a message is dropped before the delay
    pub packet_loss: f64,
    /// Probability in `[0, 1]` of corruption and, independently, duplication
    pub duplication: f64,
    /// Bytes per second, 0 for unlimited
    pub bandwidth: u64,
    /// Whether this link was configured as partitioned
    pub partitioned: bool,
    /// Nodes on this link's side of a configured partition
    pub partition_nodes: Vec<NodeId>,
    /// Probability in `[0, 1]` of corruption
    pub corruption: f64,
}

impl Default for NetworkConditions {
    /// 1ms latency, no jitter, no faults.
    fn default() -> Self {
        Self {
            base_latency: Duration::from_millis(1),
            latency_jitter: Duration::ZERO,
            packet_loss: 0.0,
            duplication: 0.0,
            bandwidth: 0,
            partitioned: false,
            partition_nodes: Vec::new(),
            corruption: 0.0,
        }
    }
}

impl NetworkConditions {
    /// Instant, lossless delivery.
    pub fn perfect() -> Self {
        Self { base_latency: Duration::ZERO, ..Self::default() }
    }

    /// Default conditions with the given loss probability.
    pub fn with_packet_loss(packet_loss: f64) -> Self {
        Self { packet_loss, ..Self::default() }
    }

    /// Longest delay a message on this link can experience.
    pub fn max_delay(&self) -> Duration {
        self.base_latency + self.latency_jitter
    }

    /// Check that every probability lies in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConditionsError> {
        for (field, value) in [
            ("packet_loss", self.packet_loss),
            ("duplication", self.duplication),
            ("corruption", self.corruption),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConditionsError::ProbabilityOutOfRange { field, value });
            }
        }
        Ok(())
    }
}
