//! Fuzz target for the mesh registry and transports
//!
//! Catch divergence between the fabric and its reference model under
//! arbitrary topology churn.
//!
//! # Strategy
//!
//! - Operation sequences: node creation, replacement, removal and closing
//!   interleaved with sends, broadcasts and partition changes
//! - Missing and closed nodes: operations naming nodes that never existed or
//!   whose transport is already closed
//!
//! # Invariants
//!
//! - Every operation returns the same result as the model
//! - Per-node delivered/sent/dropped counters match the model after every
//!   operation
//! - NEVER panic on any operation sequence

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use meshforge_harness::{MeshDriver, ModelMesh, Operation};

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    /// Seed of the mesh environment.
    seed: u64,
    /// Operation sequence to apply.
    ops: Vec<Operation>,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(runtime) =
        tokio::runtime::Builder::new_current_thread().enable_time().start_paused(true).build()
    else {
        return;
    };

    runtime.block_on(async {
        let mut model = ModelMesh::new();
        let mut real = MeshDriver::new(input.seed);

        for (i, op) in input.ops.iter().take(256).enumerate() {
            let model_result = model.apply(op);
            let real_result = real.apply(op).await;

            assert_eq!(model_result, real_result, "result divergence at operation {i}: {op:?}");
            assert_eq!(
                model.observable_state(),
                real.observable_state(),
                "state divergence after operation {i}: {op:?}"
            );
        }
    });
});
