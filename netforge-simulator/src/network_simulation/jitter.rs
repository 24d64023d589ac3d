//! # Jitter Models for Simulation
//!
//! ## Models:
//! - `RandomJitterModel`: Adds a uniform random delay from 0 up to a maximum.
//! - `NoJitterModel`: Adds nothing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait JitterModel: Send {
    fn apply_jitter(&mut self, base_ms: u64) -> u64;
}

/// Seeded so that every lane draws the same jitter sequence on every run.
#[derive(Debug)]
pub struct RandomJitterModel {
    magnitude_ms: u64,
    rng: StdRng,
}

impl RandomJitterModel {
    pub fn new(magnitude_ms: u64, seed: u64) -> Self {
        Self {
            magnitude_ms,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl JitterModel for RandomJitterModel {
    #[inline]
    fn apply_jitter(&mut self, base_ms: u64) -> u64 {
        base_ms.saturating_add(self.rng.random_range(0..=self.magnitude_ms))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoJitterModel;

impl JitterModel for NoJitterModel {
    #[inline]
    fn apply_jitter(&mut self, base_ms: u64) -> u64 {
        base_ms
    }
}
