//! Outcome of one simulation run.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::{EventKind, SimEvent};
use crate::node::NodeStats;
use crate::state::{FailureCause, NodeState};
use crate::transport::{LinkSample, TransportStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Complete,
    TimedOut,
    Stopped,
}

/// An actor the engine had to write off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorFault {
    pub device: String,
    pub cause: FailureCause,
    pub at_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub events_by_kind: BTreeMap<EventKind, usize>,
    pub transport: TransportStats,
    pub nodes: BTreeMap<String, NodeStats>,
    pub rounds: u64,
    /// Messages still on the wire when the run ended.
    #[serde(default)]
    pub undelivered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub scenario: String,
    pub final_states: BTreeMap<String, NodeState>,
    pub events: Vec<SimEvent>,
    pub statistics: Statistics,
    pub link_samples: Vec<LinkSample>,
    pub actor_faults: Vec<ActorFault>,
    pub logical_duration_ms: u64,
    pub wall_duration: Duration,
    pub completion: Completion,
    /// BLAKE3 digest of the event sequence and final states.
    pub fingerprint: String,
}

impl SimulationResult {
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Complete
    }

    pub fn states_in(&self, state: NodeState) -> Vec<&str> {
        self.final_states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(d, _)| d.as_str())
            .collect()
    }

    pub fn failed_devices(&self) -> Vec<&str> {
        self.states_in(NodeState::Failed)
    }

    pub fn events_of(&self, kind: EventKind) -> impl Iterator<Item = &SimEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}

/// Digest over what makes two runs equal: the ordered events and the final
/// state of every device. Wall time and counters are left out.
pub fn fingerprint(events: &[SimEvent], final_states: &BTreeMap<String, NodeState>) -> String {
    let mut hasher = blake3::Hasher::new();
    for event in events {
        let line = format!(
            "{}|{}|{}|{}|{:?}\n",
            event.seq,
            event.at_ms,
            event.device.as_deref().unwrap_or("-"),
            event.kind,
            event.detail
        );
        hasher.update(line.as_bytes());
    }
    for (device, state) in final_states {
        hasher.update(format!("{device}={state}\n").as_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventDetail;

    fn event(seq: u64, device: &str) -> SimEvent {
        SimEvent {
            seq,
            at_ms: seq,
            device: Some(device.to_string()),
            kind: EventKind::Started,
            detail: EventDetail::Transition {
                from: NodeState::Offline,
                to: NodeState::Starting,
            },
        }
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        let states = BTreeMap::from([("A".to_string(), NodeState::Starting)]);
        let forward = fingerprint(&[event(0, "A"), event(1, "B")], &states);
        let swapped = fingerprint(&[event(0, "B"), event(1, "A")], &states);
        assert_eq!(forward.len(), 64);
        assert_ne!(forward, swapped);
        assert_eq!(forward, fingerprint(&[event(0, "A"), event(1, "B")], &states));
    }

    #[test]
    fn final_states_change_the_fingerprint() {
        let events = [event(0, "A")];
        let up = BTreeMap::from([("A".to_string(), NodeState::Operational)]);
        let down = BTreeMap::from([("A".to_string(), NodeState::Failed)]);
        assert_ne!(fingerprint(&events, &up), fingerprint(&events, &down));
    }
}
