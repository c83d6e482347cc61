//! Seeded Environment implementation for reproducible runs.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use meshforge_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Environment whose randomness comes from a single seeded `ChaCha8` stream.
///
/// Clones share the stream, so every transport of a mesh draws from the same
/// sequence. Two runs with the same seed and the same order of draws make
/// identical fault decisions.
///
/// Time is the tokio clock, so scenarios run under `start_paused` advance
/// virtually.
#[derive(Debug, Clone)]
pub struct SeededEnv {
    seed: u64,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SeededEnv {
    /// Create an environment from a seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed, rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }

    /// Seed this environment was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Environment for SeededEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
