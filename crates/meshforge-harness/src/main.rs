//! Meshforge simulator binary.
//!
//! # Usage
//!
//! ```bash
//! # Five nodes, 10% loss, reproducible
//! meshforge-sim --nodes 5 --loss 0.1 --seed 42
//!
//! # From a config file, isolating one node
//! meshforge-sim --config sim.toml --partition node-3
//! ```

use std::time::Duration;

use clap::Parser;
use meshforge_harness::{Scenario, SimulationConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Meshforge fault-injection simulator
#[derive(Parser, Debug)]
#[command(name = "meshforge-sim")]
#[command(about = "Run heartbeat rounds over a simulated faulty mesh")]
#[command(version)]
struct Args {
    /// Simulation config file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Number of nodes, named node-1 .. node-N
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Heartbeat rounds to run
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Seed for every fault decision
    #[arg(short, long)]
    seed: Option<u64>,

    /// Packet loss probability on every link
    #[arg(long)]
    loss: Option<f64>,

    /// Base latency on every link (e.g. "5ms")
    #[arg(long, value_parser = parse_duration)]
    latency: Option<Duration>,

    /// Latency jitter bound on every link (e.g. "2ms")
    #[arg(long, value_parser = parse_duration)]
    jitter: Option<Duration>,

    /// Corruption and duplication probability on every link
    #[arg(long)]
    duplication: Option<f64>,

    /// Nodes to move to the partitioned side
    #[arg(long, num_args = 1..)]
    partition: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

impl Args {
    fn into_config(self) -> Result<SimulationConfig, meshforge_core::ConfigError> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)?,
            None => SimulationConfig::with_nodes(3),
        };

        if let Some(nodes) = self.nodes {
            config.set_node_count(nodes);
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(loss) = self.loss {
            config.conditions.packet_loss = loss;
        }
        if let Some(latency) = self.latency {
            config.conditions.base_latency = latency;
        }
        if let Some(jitter) = self.jitter {
            config.conditions.latency_jitter = jitter;
        }
        if let Some(duplication) = self.duplication {
            config.conditions.duplication = duplication;
        }
        if !self.partition.is_empty() {
            config.partition = self.partition;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = args.into_config()?;
    tracing::info!(
        nodes = config.node_ids().len(),
        seed = config.seed,
        loss = config.conditions.packet_loss,
        "meshforge simulator starting"
    );

    let report = Scenario::from_config(config)?.run().await?;

    for (node_id, node) in &report.nodes {
        tracing::info!(
            node_id = %node_id,
            received = node.received,
            corrupted = node.corrupted,
            sent = node.stats.messages_sent,
            dropped = node.stats.messages_dropped,
            duplicated = node.stats.messages_duplicated,
            "node summary"
        );
    }
    tracing::info!(
        received = report.total_received(),
        dropped = report.total_dropped(),
        "simulation complete"
    );

    Ok(())
}
