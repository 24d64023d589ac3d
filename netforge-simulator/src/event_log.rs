//! Round-ordered event log.
//!
//! Every round has a fixed number of commit slots: slot 0 belongs to the
//! engine, the following slots to the participating actors in device order.
//! Actors work in parallel but a commit for slot `n` blocks until slots
//! `0..n` have committed, so sequence numbers follow slot order no matter how
//! the threads were scheduled.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use crate::events::{EventDraft, SimEvent};

#[derive(Debug, Default)]
struct LogState {
    events: Vec<SimEvent>,
    round: u64,
    now_ms: u64,
    slots: usize,
    turn: usize,
    skipped: Vec<bool>,
}

impl LogState {
    fn append(&mut self, drafts: Vec<EventDraft>) {
        for draft in drafts {
            let seq = self.events.len() as u64;
            self.events.push(SimEvent {
                seq,
                at_ms: self.now_ms,
                device: draft.device,
                kind: draft.kind,
                detail: draft.detail,
            });
        }
    }

    fn advance_turn(&mut self) {
        self.turn += 1;
        while self.turn < self.slots && self.skipped[self.turn] {
            self.turn += 1;
        }
    }

    fn round_closed(&self) -> bool {
        self.turn >= self.slots
    }
}

#[derive(Debug, Default)]
pub struct EventLog {
    state: Mutex<LogState>,
    turn_changed: Condvar,
}

/// Commit slots that missed the round deadline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundOutcome {
    pub missed_slots: Vec<usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a round with `slots` commit positions. Commits still waiting
    /// for an earlier round are released and discarded.
    pub fn open_round(&self, round: u64, now_ms: u64, slots: usize) {
        let mut state = self.state.lock();
        state.round = round;
        state.now_ms = now_ms;
        state.slots = slots;
        state.turn = 0;
        state.skipped = vec![false; slots];
        self.turn_changed.notify_all();
    }

    /// Appends `drafts` once it is `slot`'s turn. Returns false if the
    /// commit belongs to a round that is no longer open or whose slot was
    /// given up on.
    pub fn commit(&self, round: u64, slot: usize, drafts: Vec<EventDraft>) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.round != round || slot >= state.slots || state.skipped[slot] {
                return false;
            }
            if state.turn == slot {
                break;
            }
            if state.turn > slot {
                return false;
            }
            self.turn_changed.wait(&mut state);
        }
        state.append(drafts);
        state.advance_turn();
        self.turn_changed.notify_all();
        true
    }

    /// Blocks until every slot of `round` has committed. A slot that holds up
    /// the round for longer than `deadline` is skipped and reported; the
    /// slots queued behind it then get a fresh deadline.
    pub fn await_round(&self, round: u64, deadline: Duration) -> RoundOutcome {
        let mut outcome = RoundOutcome::default();
        let mut state = self.state.lock();
        let mut until = Instant::now() + deadline;
        while state.round == round && !state.round_closed() {
            let turn = state.turn;
            if self.turn_changed.wait_until(&mut state, until).timed_out()
                && state.round == round
                && state.turn == turn
                && !state.round_closed()
            {
                warn!(round, slot = turn, "Commit slot missed the round deadline");
                state.skipped[turn] = true;
                outcome.missed_slots.push(turn);
                state.advance_turn();
                self.turn_changed.notify_all();
                until = Instant::now() + deadline;
            }
        }
        outcome
    }

    /// Appends engine events outside the slot protocol, after a round closed.
    pub fn append(&self, drafts: Vec<EventDraft>) {
        self.state.lock().append(drafts);
    }

    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events with sequence numbers from `from` on.
    pub fn events_since(&self, from: usize) -> Vec<SimEvent> {
        let state = self.state.lock();
        state.events.get(from..).map(<[SimEvent]>::to_vec).unwrap_or_default()
    }

    pub fn snapshot(&self) -> Vec<SimEvent> {
        self.state.lock().events.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::state::NodeState;
    use std::sync::Arc;
    use std::thread;

    fn draft(device: &str) -> Vec<EventDraft> {
        vec![EventDraft::transition(
            device,
            EventKind::Started,
            NodeState::Offline,
            NodeState::Starting,
        )]
    }

    #[test]
    fn commits_follow_slot_order() {
        let log = Arc::new(EventLog::new());
        log.open_round(1, 0, 4);
        let handles: Vec<_> = (1..4)
            .rev()
            .map(|slot| {
                let log = Arc::clone(&log);
                thread::spawn(move || log.commit(1, slot, draft(&format!("n{slot}"))))
            })
            .collect();
        assert!(log.commit(1, 0, Vec::new()));
        let outcome = log.await_round(1, Duration::from_secs(5));
        assert!(outcome.missed_slots.is_empty());
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        let devices: Vec<String> = log
            .snapshot()
            .into_iter()
            .filter_map(|e| e.device)
            .collect();
        assert_eq!(devices, vec!["n1", "n2", "n3"]);
    }

    #[test]
    fn missing_slot_is_skipped_after_deadline() {
        let log = Arc::new(EventLog::new());
        log.open_round(1, 0, 3);
        assert!(log.commit(1, 0, Vec::new()));
        let late = {
            let log = Arc::clone(&log);
            thread::spawn(move || log.commit(1, 2, draft("n2")))
        };
        let outcome = log.await_round(1, Duration::from_millis(50));
        assert_eq!(outcome.missed_slots, vec![1]);
        assert!(late.join().unwrap());
        assert!(!log.commit(1, 1, draft("n1")));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn stale_round_commit_is_discarded() {
        let log = EventLog::new();
        log.open_round(1, 0, 1);
        assert!(log.commit(1, 0, Vec::new()));
        log.open_round(2, 1, 1);
        assert!(!log.commit(1, 0, draft("old")));
        assert!(log.is_empty());
    }
}
