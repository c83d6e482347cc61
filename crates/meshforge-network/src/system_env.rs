//! System Environment implementation using real time and OS randomness.

use std::time::{Duration, Instant};

use meshforge_core::Environment;

/// Environment backed by the system clock, the tokio timer and `getrandom`.
///
/// Fault sampling with this environment is not reproducible; use a seeded
/// environment when a run must be replayed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).unwrap_or_else(|e| {
            // With zeros every draw against p > 0 succeeds.
            tracing::error!(error = %e, "getrandom failed");
            buffer.fill(0);
        });
    }
}
