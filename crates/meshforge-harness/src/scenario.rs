//! Heartbeat scenarios over a seeded mesh.
//!
//! A scenario builds a [`NetworkManager`] on a [`SeededEnv`], applies the
//! configured link policies and partition, and runs heartbeat rounds: every
//! node broadcasts once per round, then the scenario waits one heartbeat
//! interval and drains every inbox. After the last round it waits for the
//! slowest possible delivery before the final drain.
//!
//! ```text
//! config ──▶ mesh ──▶ round 1 .. N ──▶ settle ──▶ report ──▶ oracles
//! ```
//!
//! Run under a paused tokio clock, a scenario takes no wall-clock time and,
//! for a given config, always yields the same [`ScenarioReport`].

use std::{collections::BTreeMap, time::Duration};

use meshforge_core::{Environment, Message, MessageType, NodeId, Transport};
use meshforge_network::{CORRUPTED_PAYLOAD, NetworkManager, NetworkStats};

use crate::{config::SimulationConfig, error::HarnessError, sim_env::SeededEnv};

/// Check run against the report of a finished scenario.
pub type Oracle = Box<dyn Fn(&ScenarioReport) -> Result<(), String> + Send + Sync>;

/// Outcome for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    /// Messages taken from this node's inbox
    pub received: u64,
    /// Received messages whose payload had been corrupted
    pub corrupted: u64,
    /// Counters of this node's transport at the end of the run
    pub stats: NetworkStats,
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Seed the run used
    pub seed: u64,
    /// Rounds that were run
    pub rounds: u32,
    /// Per-node outcome
    pub nodes: BTreeMap<NodeId, NodeReport>,
}

impl ScenarioReport {
    /// Messages received across the mesh.
    pub fn total_received(&self) -> u64 {
        self.nodes.values().map(|node| node.received).sum()
    }

    /// Messages enqueued across the mesh, excluding duplicates.
    pub fn total_sent(&self) -> u64 {
        self.nodes.values().map(|node| node.stats.messages_sent).sum()
    }

    /// Messages dropped across the mesh.
    pub fn total_dropped(&self) -> u64 {
        self.nodes.values().map(|node| node.stats.messages_dropped).sum()
    }

    /// Extra copies enqueued across the mesh.
    pub fn total_duplicated(&self) -> u64 {
        self.nodes.values().map(|node| node.stats.messages_duplicated).sum()
    }
}

/// Scenario builder and runner.
pub struct Scenario {
    config: SimulationConfig,
    oracles: Vec<Oracle>,
}

impl Scenario {
    /// Validate a config and wrap it in a scenario.
    pub fn from_config(config: SimulationConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        Ok(Self { config, oracles: Vec::new() })
    }

    /// Config this scenario runs.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Add a check on the final report. Oracles run in insertion order; the
    /// first failure aborts the run.
    #[must_use]
    pub fn oracle(mut self, oracle: Oracle) -> Self {
        self.oracles.push(oracle);
        self
    }

    /// Longest delivery delay any configured link can produce.
    fn max_delay(&self) -> Duration {
        self.config
            .links
            .iter()
            .map(|link| link.conditions.max_delay())
            .fold(self.config.conditions.max_delay(), Duration::max)
    }

    /// Run every round and evaluate the oracles.
    pub async fn run(&self) -> Result<ScenarioReport, HarnessError> {
        let config = &self.config;
        let env = SeededEnv::with_seed(config.seed);
        let manager = NetworkManager::with_capacity(env.clone(), config.inbox_capacity);
        let ids = config.node_ids();

        for id in &ids {
            manager.create_node(id.clone());
        }
        manager.set_all_conditions(&config.conditions)?;
        for link in &config.links {
            manager.set_link_conditions(&link.from, &link.to, link.conditions.clone())?;
        }
        if !config.partition.is_empty() {
            manager.partition(&config.partition);
        }

        tracing::info!(
            seed = config.seed,
            nodes = ids.len(),
            rounds = config.rounds,
            "scenario starting"
        );

        let mut tally: BTreeMap<NodeId, (u64, u64)> =
            ids.iter().map(|id| (id.clone(), (0, 0))).collect();

        for round in 1..=config.rounds {
            for id in &ids {
                let transport = manager.get_node(id)?;
                let heartbeat = Message::new(
                    MessageType::Heartbeat,
                    id.clone(),
                    "",
                    round.to_be_bytes().to_vec(),
                )
                .with_term(u64::from(round));
                transport.broadcast(heartbeat)?;
            }

            env.sleep(config.node.heartbeat_interval).await;
            drain_into(&manager, &mut tally)?;
            tracing::debug!(round, "round complete");
        }

        env.sleep(self.max_delay() + Duration::from_millis(1)).await;
        drain_into(&manager, &mut tally)?;

        let mut stats = manager.stats();
        let nodes = tally
            .into_iter()
            .map(|(id, (received, corrupted))| {
                let stats = stats.remove(&id).unwrap_or_default();
                (id, NodeReport { received, corrupted, stats })
            })
            .collect();
        manager.shutdown()?;

        let report = ScenarioReport { seed: config.seed, rounds: config.rounds, nodes };
        for oracle in &self.oracles {
            oracle(&report).map_err(|reason| HarnessError::Oracle { reason })?;
        }
        Ok(report)
    }
}

fn drain_into<E: Environment>(
    manager: &NetworkManager<E>,
    tally: &mut BTreeMap<NodeId, (u64, u64)>,
) -> Result<(), HarnessError> {
    for (id, (received, corrupted)) in tally.iter_mut() {
        for message in manager.get_node(id)?.receive().drain() {
            *received += 1;
            if message.payload == CORRUPTED_PAYLOAD {
                *corrupted += 1;
            }
        }
    }
    Ok(())
}
