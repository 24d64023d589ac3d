//! Pause/resume between rounds.
//!
//! The engine calls [`PauseBarrier::checkpoint`] after every round, when all
//! actors are parked on their mailboxes. A pause request is honoured there
//! and nowhere else, so a paused run holds no half-finished round.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::info;

#[derive(Debug, Default)]
struct BarrierState {
    requested: bool,
    paused: bool,
    running: bool,
    stopping: bool,
}

#[derive(Debug, Default)]
pub struct PauseBarrier {
    state: Mutex<BarrierState>,
    changed: Condvar,
}

impl PauseBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_run(&self) {
        let mut state = self.state.lock();
        state.running = true;
        state.stopping = false;
        state.paused = false;
        self.changed.notify_all();
    }

    pub(crate) fn end_run(&self) {
        let mut state = self.state.lock();
        state.running = false;
        state.paused = false;
        state.requested = false;
        self.changed.notify_all();
    }

    /// Asks the engine to pause and waits until it has. Returns whether the
    /// run is now paused; false if no run is active or it is stopping.
    pub fn pause(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running || state.stopping {
            return false;
        }
        state.requested = true;
        self.changed.notify_all();
        while state.requested && state.running && !state.stopping && !state.paused {
            self.changed.wait(&mut state);
        }
        state.paused
    }

    pub fn resume(&self) {
        let mut state = self.state.lock();
        state.requested = false;
        self.changed.notify_all();
    }

    /// Wakes every waiter for good; used on stop.
    pub fn release_all(&self) {
        let mut state = self.state.lock();
        state.stopping = true;
        state.requested = false;
        self.changed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Engine side: blocks while a pause is requested.
    pub(crate) fn checkpoint(&self) {
        let mut state = self.state.lock();
        if !state.requested || state.stopping {
            return;
        }
        state.paused = true;
        self.changed.notify_all();
        info!("Simulation paused");
        while state.requested && !state.stopping {
            self.changed.wait(&mut state);
        }
        state.paused = false;
        self.changed.notify_all();
        info!("Simulation resumed");
    }
}

/// Handle for steering a run from another thread.
#[derive(Debug, Clone, Default)]
pub struct SimulationController {
    barrier: Arc<PauseBarrier>,
    stop: Arc<AtomicBool>,
}

impl SimulationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the engine is parked between rounds.
    pub fn pause(&self) -> bool {
        self.barrier.pause()
    }

    pub fn resume(&self) {
        self.barrier.resume();
    }

    /// Ends the run after the current round. Also releases a paused run.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.barrier.release_all();
    }

    pub fn is_paused(&self) -> bool {
        self.barrier.is_paused()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub(crate) fn barrier(&self) -> &PauseBarrier {
        &self.barrier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn pause_without_run_returns_immediately() {
        let controller = SimulationController::new();
        assert!(!controller.pause());
        assert!(!controller.is_paused());
    }

    #[test]
    fn checkpoint_holds_until_resume() {
        let controller = SimulationController::new();
        controller.barrier().begin_run();

        let finished = Arc::new(AtomicBool::new(false));
        let engine = {
            let controller = controller.clone();
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                while !finished.load(Ordering::Acquire) {
                    controller.barrier().checkpoint();
                    thread::sleep(Duration::from_micros(50));
                }
            })
        };

        assert!(controller.pause());
        assert!(controller.is_paused());
        controller.resume();
        finished.store(true, Ordering::Release);
        engine.join().unwrap();
        assert!(!controller.is_paused());
    }

    #[test]
    fn stop_releases_paused_engine() {
        let controller = SimulationController::new();
        controller.barrier().begin_run();
        let engine = {
            let controller = controller.clone();
            thread::spawn(move || loop {
                controller.barrier().checkpoint();
                if controller.is_stopped() {
                    break;
                }
                thread::sleep(Duration::from_micros(50));
            })
        };
        assert!(controller.pause());
        controller.stop();
        engine.join().unwrap();
        assert!(!controller.pause());
    }
}
