//! # Packet Loss Models for Simulation
//!
//! ## Models:
//! - `ProbabilisticLossModel`: Drops messages with a given probability.
//! - `NoPacketLossModel`: Never drops.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait PacketLossModel: Send {
    fn should_drop(&mut self) -> bool;
}

#[derive(Debug)]
pub struct ProbabilisticLossModel {
    drop_probability: f64,
    rng: StdRng,
}

impl ProbabilisticLossModel {
    /// Out-of-range probabilities are clamped to `[0, 1]`.
    pub fn new(drop_probability: f64, seed: u64) -> Self {
        let drop_probability = if drop_probability.is_nan() {
            0.0
        } else {
            drop_probability.clamp(0.0, 1.0)
        };
        Self {
            drop_probability,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PacketLossModel for ProbabilisticLossModel {
    #[inline]
    fn should_drop(&mut self) -> bool {
        self.rng.random_bool(self.drop_probability)
    }
}

#[derive(Debug)]
pub struct NoPacketLossModel;

impl PacketLossModel for NoPacketLossModel {
    #[inline]
    fn should_drop(&mut self) -> bool {
        false
    }
}
