//! Chaos module.
//!
//! Random fault injection driven by the run seed. Scripted corruption goes
//! through the same transport hook, so both look identical to the receiver.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use netforge_config::ChaosConfig;

#[derive(Debug)]
pub struct ChaosMonkey {
    enabled: bool,
    probability: f64,
    rng: StdRng,
}

impl ChaosMonkey {
    pub fn new(config: &ChaosConfig, seed: u64) -> Self {
        Self {
            enabled: config.enabled,
            probability: config.fault_probability.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed ^ 0xc4a0_5c4a_05c4_a05c),
        }
    }

    /// Whether scripted fault actions are allowed.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Rolls once per round; on a hit, returns the candidate to corrupt.
    pub fn pick<'a, T>(&mut self, candidates: &'a [T]) -> Option<&'a T> {
        if !self.enabled || self.probability <= 0.0 || candidates.is_empty() {
            return None;
        }
        if !self.rng.random_bool(self.probability) {
            return None;
        }
        candidates.get(self.rng.random_range(0..candidates.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, fault_probability: f64) -> ChaosConfig {
        ChaosConfig {
            enabled,
            fault_probability,
        }
    }

    #[test]
    fn silent_without_probability() {
        let mut monkey = ChaosMonkey::new(&config(true, 0.0), 1);
        assert!((0..100).all(|_| monkey.pick(&[1, 2, 3]).is_none()));
    }

    #[test]
    fn disabled_never_picks() {
        let mut monkey = ChaosMonkey::new(&config(false, 1.0), 1);
        assert!(monkey.pick(&[1]).is_none());
    }

    #[test]
    fn certain_fault_picks_a_candidate() {
        let mut monkey = ChaosMonkey::new(&config(true, 1.0), 5);
        let candidates = ["a", "b", "c"];
        let picked = monkey.pick(&candidates).unwrap();
        assert!(candidates.contains(picked));
    }

    #[test]
    fn picks_are_seeded() {
        let draw = |seed| {
            let mut monkey = ChaosMonkey::new(&config(true, 0.5), seed);
            (0..50).map(|_| monkey.pick(&[0, 1, 2, 3]).copied()).collect::<Vec<_>>()
        };
        assert_eq!(draw(11), draw(11));
    }
}
