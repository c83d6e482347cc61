//! Reference model for model-based testing.
//!
//! The model captures where every message must end up on a loss-free mesh
//! without timers, queues or tasks. It serves as the oracle against which
//! the real fabric is verified.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Outcomes, not mechanics: Captures WHAT happens to a message, not HOW
//! - Deterministic: Same inputs produce same outputs

mod driver;
mod mesh;
pub mod operation;

pub use driver::MeshDriver;
pub use mesh::{ModelMesh, NodeCounters, ObservableState};
pub use operation::{
    MAX_NODES, NodeIndex, Operation, OperationError, OperationResult, node_id,
};
