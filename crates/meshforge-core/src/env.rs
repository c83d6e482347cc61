//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples the fabric from system resources (time,
//! sleeping, randomness). Every fault decision a transport makes is a draw
//! from its environment, so:
//!
//! - Seeded runs: a harness environment backed by a seeded RNG replays the
//!   exact same sequence of drops, delays, corruptions and duplicates.
//!
//! - System runs: the production environment uses the OS entropy pool and the
//!   tokio clock without any change to transport code.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Range: `random_unit()` is in `[0, 1)` and `random_duration(b)` is in
//!   `[0, b)` (zero when `b` is zero)

use std::time::{Duration, Instant};

/// Abstract environment providing time, randomness, and async sleeping.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: subsequent calls must return times >= previous calls.
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only delivery tasks sleep. Send, broadcast and receive never do.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a uniform `f64` in `[0, 1)`.
    ///
    /// Uses the top 53 bits of a random `u64`, so every value is exactly
    /// representable and 1.0 is never produced. A probability `p` is then
    /// sampled as `random_unit() < p`: always false for 0.0, always true for
    /// 1.0.
    #[allow(clippy::cast_precision_loss)]
    fn random_unit(&self) -> f64 {
        (self.random_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Generates a uniform duration in `[0, bound)`, or zero if `bound` is
    /// zero.
    fn random_duration(&self, bound: Duration) -> Duration {
        let nanos = u64::try_from(bound.as_nanos()).unwrap_or(u64::MAX);
        if nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.random_u64() % nanos)
    }
}
