//! Simulation event records.
//!
//! Events are drafted by the engine and the actors, then sequenced by the
//! [`EventLog`](crate::event_log::EventLog). Each state transition produces
//! exactly one event.

use std::fmt;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use netforge_core::topology::LinkId;

use crate::state::{FailureCause, NodeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Started,
    InterfacesUp,
    NeighborsDiscovered,
    Converged,
    Failed,
    Restored,
    RouteLearned,
    RouteWithdrawn,
    LinkDown,
    LinkUp,
    ActionRejected,
    CorruptionInjected,
    LinkCongested,
    CongestionCleared,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Started => "started",
            EventKind::InterfacesUp => "interfaces_up",
            EventKind::NeighborsDiscovered => "neighbors_discovered",
            EventKind::Converged => "converged",
            EventKind::Failed => "failed",
            EventKind::Restored => "restored",
            EventKind::RouteLearned => "route_learned",
            EventKind::RouteWithdrawn => "route_withdrawn",
            EventKind::LinkDown => "link_down",
            EventKind::LinkUp => "link_up",
            EventKind::ActionRejected => "action_rejected",
            EventKind::CorruptionInjected => "corruption_injected",
            EventKind::LinkCongested => "link_congested",
            EventKind::CongestionCleared => "congestion_cleared",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventDetail {
    Transition {
        from: NodeState,
        to: NodeState,
    },
    Failure {
        from: NodeState,
        cause: FailureCause,
    },
    Route {
        destination: Ipv4Network,
        metric: u8,
        via: Option<String>,
    },
    Link {
        link: LinkId,
        a: String,
        b: String,
    },
    Rejected {
        action: String,
        reason: String,
    },
    Corruption {
        link: LinkId,
        from: String,
        to: String,
    },
    /// `level` is 0 once congestion is cleared.
    Congestion {
        link: LinkId,
        a: String,
        b: String,
        level: u8,
    },
}

/// An event before it has been sequenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub device: Option<String>,
    pub kind: EventKind,
    pub detail: EventDetail,
}

impl EventDraft {
    pub fn transition(device: &str, kind: EventKind, from: NodeState, to: NodeState) -> Self {
        Self {
            device: Some(device.to_string()),
            kind,
            detail: EventDetail::Transition { from, to },
        }
    }

    pub fn failure(device: &str, from: NodeState, cause: FailureCause) -> Self {
        Self {
            device: Some(device.to_string()),
            kind: EventKind::Failed,
            detail: EventDetail::Failure { from, cause },
        }
    }

    pub fn rejected(action: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self {
            device: None,
            kind: EventKind::ActionRejected,
            detail: EventDetail::Rejected {
                action: action.to_string(),
                reason: reason.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimEvent {
    /// Position in the run's total order.
    pub seq: u64,
    /// Logical time of the round that produced the event.
    pub at_ms: u64,
    pub device: Option<String>,
    pub kind: EventKind,
    pub detail: EventDetail,
}

impl SimEvent {
    /// State the device is in after this event, for transition events.
    pub fn resulting_state(&self) -> Option<NodeState> {
        match self.detail {
            EventDetail::Transition { to, .. } => Some(to),
            EventDetail::Failure { .. } => Some(NodeState::Failed),
            _ => None,
        }
    }

    pub fn failure_cause(&self) -> Option<FailureCause> {
        match self.detail {
            EventDetail::Failure { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} t={}ms {} {}",
            self.seq,
            self.at_ms,
            self.device.as_deref().unwrap_or("-"),
            self.kind
        )
    }
}
