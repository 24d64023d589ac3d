//! # Virtual Clock for Simulation
//!
//! Logical time in milliseconds. Only the engine advances it, once per
//! round; actors read the round's time from their tick, so wall-clock speed
//! and pauses never show up in a run's results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    now_ms: Arc<AtomicU64>,
}

impl VirtualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Acquire)
    }

    #[inline]
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Release);
    }
}
