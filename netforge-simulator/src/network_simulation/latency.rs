//! # Latency Models for Simulation
//!
//! ## Models:
//! - `FixedLatencyModel`: Always adds a fixed delay.
//! - `NoLatencyModel`: No delay beyond the transport's one-tick minimum.

/// Trait for network latency models. Durations are logical milliseconds.
pub trait LatencyModel: Send + Sync {
    fn apply_latency(&self, base_ms: u64) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedLatencyModel {
    delay_ms: u64,
}

impl FixedLatencyModel {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            delay_ms: latency_ms,
        }
    }
}

impl LatencyModel for FixedLatencyModel {
    #[inline]
    fn apply_latency(&self, base_ms: u64) -> u64 {
        base_ms.saturating_add(self.delay_ms)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoLatencyModel;

impl LatencyModel for NoLatencyModel {
    #[inline]
    fn apply_latency(&self, base_ms: u64) -> u64 {
        base_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_latency_adds_delay() {
        assert_eq!(FixedLatencyModel::new(100).apply_latency(50), 150);
    }

    #[test]
    fn no_latency_is_identity() {
        assert_eq!(NoLatencyModel.apply_latency(50), 50);
    }
}
