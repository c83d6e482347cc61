//! Seeded simulation harness for the meshforge fabric.
//!
//! A [`SeededEnv`] makes every fault decision of a mesh reproducible from a
//! single seed. On top of it:
//!
//! - [`Scenario`] runs heartbeat rounds over a configured mesh and reports
//!   per-node delivery counts.
//! - The `model` module provides a reference implementation for model-based
//!   testing. Operations are applied to both the model and the real mesh,
//!   and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod model;
pub mod scenario;
pub mod sim_env;

pub use config::{LinkOverride, SimulationConfig};
pub use error::HarnessError;
pub use model::{
    MAX_NODES, MeshDriver, ModelMesh, NodeCounters, NodeIndex, ObservableState, Operation,
    OperationError, OperationResult,
};
pub use scenario::{NodeReport, Oracle, Scenario, ScenarioReport};
pub use sim_env::SeededEnv;
