use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Offline,
    Starting,
    Discovering,
    Converging,
    Operational,
    Failed,
    Recovering,
}

impl NodeState {
    /// States in which the device exchanges protocol traffic.
    pub fn answers_traffic(self) -> bool {
        matches!(
            self,
            NodeState::Discovering | NodeState::Converging | NodeState::Operational
        )
    }

    /// Powered on and not failed.
    pub fn is_live(self) -> bool {
        !matches!(self, NodeState::Offline | NodeState::Failed)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeState::Offline => "offline",
            NodeState::Starting => "starting",
            NodeState::Discovering => "discovering",
            NodeState::Converging => "converging",
            NodeState::Operational => "operational",
            NodeState::Failed => "failed",
            NodeState::Recovering => "recovering",
        };
        f.write_str(name)
    }
}

/// Why a device entered `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// A scripted device failure.
    InjectedFault,
    /// The device had links and the last one went down.
    LastLinkLost,
    /// A message failed validation.
    Malformed,
    /// Tick handling panicked.
    Panic,
    /// The actor missed a round deadline.
    Hung,
}

impl FailureCause {
    /// Internal faults are reported in the run's actor fault list.
    pub fn is_actor_fault(self) -> bool {
        matches!(
            self,
            FailureCause::Malformed | FailureCause::Panic | FailureCause::Hung
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_established_states_answer_traffic() {
        assert!(!NodeState::Starting.answers_traffic());
        assert!(NodeState::Discovering.answers_traffic());
        assert!(NodeState::Operational.answers_traffic());
        assert!(!NodeState::Failed.answers_traffic());
        assert!(!NodeState::Recovering.answers_traffic());
    }
}
