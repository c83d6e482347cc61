//! Property tests for fault injection.
//!
//! Each case builds its own paused current-thread runtime so that delivery
//! delays cost no wall-clock time.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use meshforge_core::{Environment, Message, MessageType, Transport};
use meshforge_network::{NetworkConditions, NetworkManager, NetworkTransport};
use proptest::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded environment so that probabilistic cases replay exactly.
#[derive(Clone)]
struct TestEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl TestEnv {
    fn new(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }
}

impl Environment for TestEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().expect("rng lock").fill_bytes(buffer);
    }
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime")
}

fn heartbeat(from: &str, to: &str) -> Message {
    Message::new(MessageType::Heartbeat, from, to, "ping")
}

fn build_mesh(seed: u64, nodes: usize) -> NetworkManager<TestEnv> {
    populate(NetworkManager::with_env(TestEnv::new(seed)), nodes)
}

fn populate(manager: NetworkManager<TestEnv>, nodes: usize) -> NetworkManager<TestEnv> {
    for i in 0..nodes {
        manager.create_node(format!("node-{i}"));
    }
    manager
}

proptest! {
    #[test]
    fn prop_partition_decides_reachability(
        mask in prop::collection::vec(any::<bool>(), 2..6),
        seed in any::<u64>(),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let manager = build_mesh(seed, mask.len());
            let ids = manager.node_ids();
            let partitioned: Vec<_> = ids
                .iter()
                .zip(&mask)
                .filter(|(_, cut)| **cut)
                .map(|(id, _)| id.clone())
                .collect();
            manager.partition(&partitioned);

            for from in &ids {
                let transport = manager.get_node(from).expect("node exists");
                for to in ids.iter().filter(|to| *to != from) {
                    transport.send(to, heartbeat(from, to)).expect("send");
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;

            for (id, side) in ids.iter().zip(&mask) {
                let same_side = mask.iter().filter(|other| *other == side).count() - 1;
                let other_side = mask.len() - 1 - same_side;

                let transport = manager.get_node(id).expect("node exists");
                let stats = transport.stats();
                prop_assert_eq!(stats.messages_sent as usize, same_side);
                prop_assert_eq!(stats.messages_dropped as usize, other_side);
                prop_assert_eq!(transport.receive().drain().len(), same_side);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_total_loss_never_delivers(sends in 1usize..50, seed in any::<u64>()) {
        let rt = paused_runtime();
        rt.block_on(async {
            let manager = build_mesh(seed, 2);
            manager
                .set_link_conditions("node-0", "node-1", NetworkConditions::with_packet_loss(1.0))
                .expect("valid conditions");
            let sender = manager.get_node("node-0").expect("node exists");

            for expected in 1..=sends {
                sender.send("node-1", heartbeat("node-0", "node-1")).expect("silent drop");
                prop_assert_eq!(sender.stats().messages_dropped as usize, expected);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;

            let receiver = manager.get_node("node-1").expect("node exists");
            prop_assert!(receiver.receive().is_empty());
            prop_assert_eq!(sender.stats().messages_sent, 0);
            Ok(())
        })?;
    }

    #[test]
    fn prop_zero_loss_delivers_everything(sends in 1usize..200, seed in any::<u64>()) {
        let rt = paused_runtime();
        rt.block_on(async {
            let manager = build_mesh(seed, 2);
            let jittery = NetworkConditions {
                latency_jitter: Duration::from_millis(5),
                ..NetworkConditions::default()
            };
            manager.set_link_conditions("node-0", "node-1", jittery).expect("valid conditions");
            let sender = manager.get_node("node-0").expect("node exists");

            for _ in 0..sends {
                sender.send("node-1", heartbeat("node-0", "node-1")).expect("send");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;

            let receiver = manager.get_node("node-1").expect("node exists");
            prop_assert_eq!(receiver.receive().drain().len(), sends);
            prop_assert_eq!(sender.stats().messages_sent as usize, sends);
            prop_assert_eq!(sender.stats().messages_dropped, 0);
            Ok(())
        })?;
    }
}

#[test]
fn partial_loss_matches_probability() {
    const SENDS: u64 = 2000;

    let rt = paused_runtime();
    rt.block_on(async {
        // Room for every send, so only the loss draw can drop
        let manager = populate(NetworkManager::with_capacity(TestEnv::new(7), SENDS as usize), 2);
        manager
            .set_link_conditions("node-0", "node-1", NetworkConditions::with_packet_loss(0.3))
            .expect("valid conditions");
        let sender = manager.get_node("node-0").expect("node exists");

        for _ in 0..SENDS {
            sender.send("node-1", heartbeat("node-0", "node-1")).expect("send");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        let stats = sender.stats();
        let receiver = manager.get_node("node-1").expect("node exists");
        assert_eq!(stats.messages_sent + stats.messages_dropped, SENDS);
        assert_eq!(receiver.receive().drain().len() as u64, stats.messages_sent);
        assert!(
            (500..700).contains(&stats.messages_dropped),
            "dropped {} of {SENDS} at p = 0.3",
            stats.messages_dropped
        );
    });
}

#[test]
fn same_seed_replays_same_drops() {
    let run = |seed: u64| {
        paused_runtime().block_on(async {
            let manager = build_mesh(seed, 2);
            let flaky = NetworkConditions { duplication: 0.5, ..NetworkConditions::with_packet_loss(0.5) };
            manager.set_link_conditions("node-0", "node-1", flaky).expect("valid conditions");
            let sender = manager.get_node("node-0").expect("node exists");

            for _ in 0..100 {
                sender.send("node-1", heartbeat("node-0", "node-1")).expect("send");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            sender.stats()
        })
    };

    assert_eq!(run(42), run(42));
}

#[test]
fn same_seed_replays_broadcast_under_loss() {
    const NODES: usize = 8;

    let run = || {
        paused_runtime().block_on(async {
            let manager = build_mesh(42, NODES);
            manager
                .set_all_conditions(&NetworkConditions::with_packet_loss(0.5))
                .expect("valid conditions");
            let sender = manager.get_node("node-0").expect("node exists");

            sender.broadcast(heartbeat("node-0", "")).expect("broadcast");
            tokio::time::sleep(Duration::from_millis(10)).await;

            let per_peer: BTreeMap<_, _> = sender
                .stats()
                .node_stats
                .into_iter()
                .map(|(peer, stats)| (peer, stats.sent))
                .collect();
            let reached: Vec<_> = manager
                .node_ids()
                .into_iter()
                .filter(|id| {
                    manager.get_node(id).is_ok_and(|node| !node.receive().drain().is_empty())
                })
                .collect();
            (per_peer, reached)
        })
    };

    let (first_sent, first_reached) = run();
    assert_eq!(first_sent.values().sum::<u64>() as usize, first_reached.len());
    assert!(first_reached.len() < NODES - 1, "loss 0.5 over {} peers dropped nothing", NODES - 1);
    for _ in 0..4 {
        let (sent, reached) = run();
        assert_eq!(sent, first_sent);
        assert_eq!(reached, first_reached);
    }
}

#[test]
fn conditions_parse_from_toml() {
    let conditions: NetworkConditions = toml::from_str(
        r#"
        base_latency = "20ms"
        latency_jitter = "5ms"
        packet_loss = 0.1
        "#,
    )
    .expect("valid toml");

    assert_eq!(conditions.base_latency, Duration::from_millis(20));
    assert_eq!(conditions.latency_jitter, Duration::from_millis(5));
    assert!((conditions.packet_loss - 0.1).abs() < f64::EPSILON);
    assert!(conditions.duplication.abs() < f64::EPSILON);
    assert_eq!(conditions.max_delay(), Duration::from_millis(25));
    assert!(conditions.validate().is_ok());
}
