/*!
# Netforge Simulator

Deterministic, multi-threaded lifecycle simulation of a built topology.

## Key Components:
- **Virtual Clock:** logical milliseconds, advanced one tick per round.
- **Transport:** per-link FIFO lanes with seeded latency, jitter and loss.
- **Node Actors:** one thread per device running discovery and a minimal
  distance-vector exchange.
- **Event Log:** slot-ordered commits giving a total order per seed.
- **Engine:** Day-1 bring-up, Day-2 scripts, pause/resume, stop and fault
  injection.
*/

pub mod barrier;
pub mod chaos;
pub mod engine;
pub mod error;
pub mod event_log;
pub mod events;
pub mod message;
pub mod network_simulation;
pub mod node;
pub mod result;
pub mod scenario;
pub mod state;
pub mod transport;
pub mod virtual_clock;

pub use barrier::SimulationController;
pub use engine::{run, SimulationEngine};
pub use error::{ActorError, SimulationError};
pub use events::{EventDetail, EventKind, SimEvent};
pub use node::NodeStats;
pub use result::{ActorFault, Completion, SimulationResult, Statistics};
pub use scenario::{Scenario, ScenarioAction, ScenarioScript, ScheduledAction};
pub use state::{FailureCause, NodeState};
pub use transport::{LinkSample, TransportStats};
