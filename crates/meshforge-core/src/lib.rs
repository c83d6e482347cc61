//! Meshforge core seams.
//!
//! Everything a fabric implementation and its consumers agree on, without
//! committing to a particular runtime or fault model:
//!
//! ```text
//! meshforge-core
//!   ├─ Environment   (time, sleep, randomness)
//!   ├─ Transport     (what a consensus node sends and receives through)
//!   ├─ Mailbox/Inbox (bounded, non-blocking inbound queue)
//!   └─ NodeConfig    (node settings loaded from TOML)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod env;
pub mod queue;
pub mod transport;

pub use config::{ConfigError, NodeConfig};
pub use env::Environment;
pub use meshforge_proto::{Message, MessageType, NodeId};
pub use queue::{Inbox, Mailbox, OfferError, bounded};
pub use transport::{Transport, TransportError};
