//! Simulated round-trip latency applied before every data access call.

use std::time::Duration;

use rand::Rng;

// ---

/// Delay policy for the data access facade.
///
/// Tests use [`Latency::None`]; the service defaults to a fixed delay that
/// mimics a network round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Latency {
    #[default]
    None,
    Fixed(Duration),
    /// Uniformly distributed in `[min, max]`.
    Uniform { min: Duration, max: Duration },
}

impl Latency {
    // ---
    /// Build a policy from a base delay and an optional jitter, both in ms.
    pub fn from_millis(base_ms: u64, jitter_ms: u64) -> Self {
        // ---
        match (base_ms, jitter_ms) {
            (0, 0) => Latency::None,
            (base, 0) => Latency::Fixed(Duration::from_millis(base)),
            (base, jitter) => Latency::Uniform {
                min: Duration::from_millis(base),
                max: Duration::from_millis(base + jitter),
            },
        }
    }

    /// Draw the delay for one call.
    pub fn sample(&self) -> Duration {
        // ---
        match *self {
            Latency::None => Duration::ZERO,
            Latency::Fixed(d) => d,
            Latency::Uniform { min, max } if max > min => {
                rand::thread_rng().gen_range(min..=max)
            }
            Latency::Uniform { min, .. } => min,
        }
    }

    pub async fn wait(&self) {
        // ---
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
