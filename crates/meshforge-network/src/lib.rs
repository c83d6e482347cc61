//! Fault-injecting in-memory network fabric.
//!
//! Wires named logical nodes into a fully connected mesh without sockets and
//! lets a test harness degrade any directed link: latency, jitter, loss,
//! duplication, corruption and partitions.
//!
//! ## Architecture
//!
//! ```text
//! meshforge-network
//!   ├─ NetworkManager     (registry, sole writer of the membership)
//!   ├─ MemoryTransport    (one per node: fault sampling + delivery tasks)
//!   ├─ Membership         (immutable snapshot: node ID → mailbox)
//!   ├─ NetworkConditions  (per-link fault policy)
//!   ├─ NetworkStats       (delivery counters)
//!   └─ SystemEnv          (system clock and OS randomness)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use meshforge_core::{Message, MessageType, Transport};
//! use meshforge_network::NetworkManager;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = NetworkManager::new();
//! let node1 = manager.create_node("node-1");
//! let node2 = manager.create_node("node-2");
//!
//! node1.send("node-2", Message::new(MessageType::Heartbeat, "node-1", "node-2", "hello"))?;
//! let received = node2.receive().recv().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod conditions;
mod error;
mod manager;
mod membership;
mod memory;
mod stats;
mod system_env;

pub use conditions::{ConditionsError, NetworkConditions};
pub use error::NetworkError;
pub use manager::NetworkManager;
pub use membership::Membership;
pub use memory::{CORRUPTED_PAYLOAD, DEFAULT_INBOX_CAPACITY, MemoryTransport, NetworkTransport};
pub use stats::{NetworkStats, NodeStats};
pub use system_env::SystemEnv;
