//! ## netforge-simulator::network_simulation
//! **Per-lane delivery conditions (latency/jitter/loss)**
//!
//! ### Key Submodules:
//! - `latency`: fixed one-way delay
//! - `jitter`: bounded random extra delay
//! - `packet_loss`: probabilistic drops
//!
//! Every lane of the transport owns its own [`LinkConditions`], seeded from
//! the run seed and the lane identity, so draws on one lane never depend on
//! traffic elsewhere.

use netforge_config::NetworkModelConfig;

pub mod jitter;
pub mod latency;
pub mod packet_loss;

use jitter::{JitterModel, NoJitterModel, RandomJitterModel};
use latency::{FixedLatencyModel, LatencyModel, NoLatencyModel};
use packet_loss::{NoPacketLossModel, PacketLossModel, ProbabilisticLossModel};

pub struct LinkConditions {
    latency: Box<dyn LatencyModel>,
    jitter: Box<dyn JitterModel>,
    loss: Box<dyn PacketLossModel>,
}

impl LinkConditions {
    pub fn new(
        latency: Box<dyn LatencyModel>,
        jitter: Box<dyn JitterModel>,
        loss: Box<dyn PacketLossModel>,
    ) -> Self {
        Self {
            latency,
            jitter,
            loss,
        }
    }

    /// Picks the no-op models for zeroed settings.
    pub fn from_config(config: &NetworkModelConfig, seed: u64) -> Self {
        let latency: Box<dyn LatencyModel> = if config.latency_ms == 0 {
            Box::new(NoLatencyModel)
        } else {
            Box::new(FixedLatencyModel::new(config.latency_ms))
        };
        let jitter: Box<dyn JitterModel> = if config.jitter_ms == 0 {
            Box::new(NoJitterModel)
        } else {
            Box::new(RandomJitterModel::new(config.jitter_ms, seed))
        };
        let loss: Box<dyn PacketLossModel> = if config.loss_probability <= 0.0 {
            Box::new(NoPacketLossModel)
        } else {
            Box::new(ProbabilisticLossModel::new(
                config.loss_probability,
                seed.rotate_left(17) ^ 0x9e37_79b9_7f4a_7c15,
            ))
        };
        Self::new(latency, jitter, loss)
    }

    /// Transit time for one message, or `None` if it is lost.
    pub fn transit_ms(&mut self) -> Option<u64> {
        if self.loss.should_drop() {
            return None;
        }
        Some(self.jitter.apply_jitter(self.latency.apply_latency(0)))
    }
}

/// Highest loss probability congestion can push a link to.
pub const MAX_CONGESTION_LOSS: f64 = 0.5;

/// Conditions of a link loaded to `level_percent` (clamped to 100): latency
/// grows up to elevenfold and loss by up to ten points, capped at
/// [`MAX_CONGESTION_LOSS`]. Jitter is left as configured.
pub fn congested(base: &NetworkModelConfig, level_percent: u8) -> NetworkModelConfig {
    let level = u64::from(level_percent.min(100));
    NetworkModelConfig {
        latency_ms: base.latency_ms.max(1) * (100 + 10 * level) / 100,
        jitter_ms: base.jitter_ms,
        loss_probability: (base.loss_probability + level as f64 / 1000.0)
            .min(MAX_CONGESTION_LOSS),
    }
}

impl std::fmt::Debug for LinkConditions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkConditions").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn congestion_scales_latency_and_loss() {
        let base = NetworkModelConfig {
            latency_ms: 2,
            jitter_ms: 1,
            loss_probability: 0.0,
        };
        let full = congested(&base, 100);
        assert_eq!(full.latency_ms, 22);
        assert_eq!(full.jitter_ms, 1);
        assert!((full.loss_probability - 0.1).abs() < 1e-9);

        let none = congested(&base, 0);
        assert_eq!(none, base);

        let lossy = NetworkModelConfig {
            loss_probability: 0.45,
            ..base
        };
        assert_eq!(congested(&lossy, 200).loss_probability, MAX_CONGESTION_LOSS);
    }

    proptest! {
        #[test]
        fn transit_is_bounded_by_latency_and_jitter(
            latency_ms in 0u64..50,
            jitter_ms in 0u64..20,
            seed in any::<u64>(),
        ) {
            let config = NetworkModelConfig {
                latency_ms,
                jitter_ms,
                loss_probability: 0.0,
            };
            let mut conditions = LinkConditions::from_config(&config, seed);
            for _ in 0..32 {
                let transit = conditions.transit_ms();
                prop_assert!(matches!(
                    transit,
                    Some(t) if (latency_ms..=latency_ms + jitter_ms).contains(&t)
                ));
            }
        }
    }

    #[test]
    fn zeroed_config_is_instant_and_lossless() {
        let config = NetworkModelConfig {
            latency_ms: 0,
            jitter_ms: 0,
            loss_probability: 0.0,
        };
        let mut conditions = LinkConditions::from_config(&config, 1);
        assert!((0..100).all(|_| conditions.transit_ms() == Some(0)));
    }

    #[test]
    fn latency_and_jitter_combine() {
        let config = NetworkModelConfig {
            latency_ms: 3,
            jitter_ms: 2,
            loss_probability: 0.0,
        };
        let mut conditions = LinkConditions::from_config(&config, 1);
        for _ in 0..100 {
            let transit = conditions.transit_ms().unwrap();
            assert!((3..=5).contains(&transit));
        }
    }
}
