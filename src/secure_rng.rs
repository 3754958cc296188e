//! Per-job random number generation.
//!
//! Every resampling job owns its own ChaCha20 stream. Unseeded runs draw each
//! job's key from OS entropy so concurrently running jobs never share state;
//! seeded runs derive each job's seed from `(base seed, batch, job)` through
//! [`mix_seed`] so that the stream depends only on the job's position in the
//! schedule, not on which thread or transport executes it.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

// Golden ratio constant for seed mixing
const GOLDEN_RATIO_SEED_MIX: u64 = 0x9E3779B97F4A7C15;

/// Mix seed with an index for deterministic, decorrelated random streams.
///
/// Uses golden ratio multiplication and bit rotation to avoid correlation
/// between adjacent indices.
pub fn mix_seed(base_seed: u64, index: usize) -> u64 {
    base_seed
        .wrapping_mul(GOLDEN_RATIO_SEED_MIX)
        .wrapping_add(index as u64)
        .rotate_left(17)
}

/// Seed for job `job` of batch `batch`, or `None` for an entropy-seeded job.
pub fn job_seed(base_seed: Option<u64>, batch: usize, job: usize) -> Option<u64> {
    base_seed.map(|seed| mix_seed(mix_seed(seed, batch), job))
}

/// ChaCha20-backed generator owned by a single job.
#[derive(Clone, Debug)]
pub struct SecureRng {
    rng: ChaCha20Rng,
}

impl SecureRng {
    /// Generator keyed from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Generator with a fixed seed.
    ///
    /// `seed_from_u64` expands the u64 to the full 256-bit key.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is `Some`, entropy-keyed otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::with_seed)
    }

    /// Random f64 in [0, 1).
    pub fn f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform in-place shuffle (Fisher-Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

impl Default for SecureRng {
    fn default() -> Self {
        Self::new()
    }
}
