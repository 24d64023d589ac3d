//! Per-device actor.
//!
//! Each device runs on its own thread and owns everything about itself: its
//! lifecycle state, its ports, its route table and its counters. The engine
//! talks to it only through the mailbox; peers talk to it only through the
//! transport.
//!
//! Lifecycle:
//! ```text
//! Offline -> Starting -> Discovering -> Converging -> Operational
//!                ^                                        |
//!                |          (any live state) -> Failed <--+
//!                +--- Discovering <- Recovering <--+
//! ```

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use netforge_config::SimulatorConfig;
use netforge_core::topology::LinkId;

use crate::error::ActorError;
use crate::event_log::EventLog;
use crate::events::{EventDetail, EventDraft, EventKind};
use crate::message::{Envelope, Payload, RouteEntry, INFINITY};
use crate::state::{FailureCause, NodeState};
use crate::transport::{Port, SendOutcome};

/// Timers an actor runs on, in logical milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTimings {
    pub boot_ms: u64,
    pub hello_interval_ms: u64,
    pub convergence_window_ms: u64,
}

impl From<&SimulatorConfig> for NodeTimings {
    fn from(config: &SimulatorConfig) -> Self {
        Self {
            boot_ms: config.boot_ms,
            hello_interval_ms: config.hello_interval_ms.max(1),
            convergence_window_ms: config.convergence_window_ms,
        }
    }
}

/// Engine-issued instruction, applied at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Fail,
    Restore,
    LinkDown(LinkId),
    LinkUp(LinkId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorCommand {
    Control(Control),
    Tick { round: u64, slot: usize, now_ms: u64 },
    Stop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_ignored: u64,
    pub messages_dropped: u64,
    pub hellos_sent: u64,
    pub adverts_sent: u64,
    pub routes_learned: u64,
    pub routes_withdrawn: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub destination: Ipv4Network,
    pub metric: u8,
    pub via: Option<LinkId>,
    pub next_hop: Option<String>,
}

/// What an actor hands back when it exits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorReport {
    pub device: String,
    pub state: NodeState,
    pub failure: Option<FailureCause>,
    pub stats: NodeStats,
    pub routes: Vec<Route>,
}

#[derive(Debug)]
struct PortState {
    port: Port,
    subnet: Ipv4Network,
    up: bool,
    acked: bool,
    last_hello_at: Option<u64>,
}

type RouteKey = (u32, u8);

fn route_key(net: &Ipv4Network) -> RouteKey {
    (u32::from(net.network()), net.prefix())
}

#[derive(Debug)]
pub struct NodeActor {
    id: String,
    state: NodeState,
    failure: Option<FailureCause>,
    ports: Vec<PortState>,
    routes: BTreeMap<RouteKey, Route>,
    entered_at: u64,
    last_route_change_at: u64,
    routes_dirty: bool,
    timings: NodeTimings,
    stats: NodeStats,
    drafts: Vec<EventDraft>,
}

impl NodeActor {
    /// `ports` pairs each incident port with the subnet of its link.
    pub fn new(id: impl Into<String>, ports: Vec<(Port, Ipv4Network)>, timings: NodeTimings) -> Self {
        let ports = ports
            .into_iter()
            .map(|(port, subnet)| PortState {
                up: port.is_up(),
                port,
                subnet,
                acked: false,
                last_hello_at: None,
            })
            .collect();
        Self {
            id: id.into(),
            state: NodeState::Offline,
            failure: None,
            ports,
            routes: BTreeMap::new(),
            entered_at: 0,
            last_route_change_at: 0,
            routes_dirty: false,
            timings,
            stats: NodeStats::default(),
            drafts: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// Mailbox loop; blocks between ticks, which is where a paused run holds
    /// every actor.
    pub fn run(mut self, mailbox: Receiver<ActorCommand>, log: Arc<EventLog>, done: Sender<ActorReport>) {
        let mut controls = Vec::new();
        while let Ok(command) = mailbox.recv() {
            match command {
                ActorCommand::Control(control) => controls.push(control),
                ActorCommand::Tick {
                    round,
                    slot,
                    now_ms,
                } => {
                    let drafts = self.tick(now_ms, std::mem::take(&mut controls));
                    if !log.commit(round, slot, drafts) {
                        debug!(device = %self.id, round, "Late commit discarded");
                    }
                }
                ActorCommand::Stop => break,
            }
        }
        if done.send(self.report()).is_err() {
            debug!(device = %self.id, "Engine stopped listening before the report");
        }
    }

    pub fn report(&self) -> ActorReport {
        ActorReport {
            device: self.id.clone(),
            state: self.state,
            failure: self.failure,
            stats: self.stats,
            routes: self.routes.values().cloned().collect(),
        }
    }

    /// Handles one round. A panic inside the handler fails the node instead
    /// of unwinding through the thread.
    pub fn tick(&mut self, now: u64, controls: Vec<Control>) -> Vec<EventDraft> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.handle_tick(now, controls)));
        if outcome.is_err() {
            warn!(device = %self.id, at_ms = now, "Tick handler panicked");
            self.drafts.clear();
            self.fail(FailureCause::Panic, now);
        }
        std::mem::take(&mut self.drafts)
    }

    fn handle_tick(&mut self, now: u64, controls: Vec<Control>) {
        for control in controls {
            self.apply_control(control, now);
        }

        match self.state {
            NodeState::Starting if now >= self.entered_at + self.timings.boot_ms => {
                self.enter_discovery(now);
            }
            NodeState::Recovering if now > self.entered_at => self.enter_discovery(now),
            _ => {}
        }

        if !self.state.answers_traffic() {
            self.discard_inbound(now);
            return;
        }

        if let Err(error) = self.process_inbound(now) {
            warn!(device = %self.id, %error, "Rejected message");
            self.fail(FailureCause::Malformed, now);
            return;
        }

        self.send_due_hellos(now);

        if self.state == NodeState::Discovering && self.ports.iter().all(|p| !p.up || p.acked) {
            self.transition(NodeState::Converging, EventKind::NeighborsDiscovered, now);
            self.last_route_change_at = now;
            self.routes_dirty = false;
            self.advertise_all(now);
        }

        if matches!(self.state, NodeState::Converging | NodeState::Operational) && self.routes_dirty {
            self.routes_dirty = false;
            self.advertise_all(now);
        }

        if self.state == NodeState::Converging
            && now >= self.last_route_change_at + self.timings.convergence_window_ms
        {
            self.transition(NodeState::Operational, EventKind::Converged, now);
        }
    }

    fn apply_control(&mut self, control: Control, now: u64) {
        match control {
            Control::Start => {
                if self.state == NodeState::Offline {
                    self.transition(NodeState::Starting, EventKind::Started, now);
                }
            }
            Control::Fail => self.fail(FailureCause::InjectedFault, now),
            Control::Restore => {
                if self.state == NodeState::Failed {
                    self.failure = None;
                    self.transition(NodeState::Recovering, EventKind::Restored, now);
                }
            }
            Control::LinkDown(link) => self.link_down(link, now),
            Control::LinkUp(link) => self.link_up(link, now),
        }
    }

    fn link_down(&mut self, link: LinkId, now: u64) {
        let Some(index) = self.port_index(link) else {
            return;
        };
        if !self.ports[index].up {
            return;
        }
        let port = &mut self.ports[index];
        port.up = false;
        port.acked = false;
        port.last_hello_at = None;
        debug!(device = %self.id, interface = port.port.local_interface(), %link, "Interface down");

        if self.state.answers_traffic() {
            self.drop_connected(index);
            self.withdraw_via(link, now);
        }
        if self.state.is_live() && self.ports.iter().all(|p| !p.up) {
            self.fail(FailureCause::LastLinkLost, now);
        }
    }

    fn link_up(&mut self, link: LinkId, now: u64) {
        let Some(index) = self.port_index(link) else {
            return;
        };
        if self.ports[index].up {
            return;
        }
        let port = &mut self.ports[index];
        port.up = true;
        port.acked = false;
        port.last_hello_at = None;
        debug!(device = %self.id, interface = port.port.local_interface(), %link, "Interface up");

        if self.state == NodeState::Failed && self.failure == Some(FailureCause::LastLinkLost) {
            self.failure = None;
            self.transition(NodeState::Recovering, EventKind::Restored, now);
        } else if self.state.answers_traffic() {
            self.install_connected(index);
        }
    }

    fn enter_discovery(&mut self, now: u64) {
        if !self.ports.is_empty() && self.ports.iter().all(|p| !p.up) {
            self.fail(FailureCause::LastLinkLost, now);
            return;
        }
        for port in &mut self.ports {
            port.acked = false;
            port.last_hello_at = None;
        }
        self.routes.clear();
        for index in 0..self.ports.len() {
            if self.ports[index].up {
                self.install_connected(index);
            }
        }
        self.transition(NodeState::Discovering, EventKind::InterfacesUp, now);
    }

    fn fail(&mut self, cause: FailureCause, now: u64) {
        if self.state == NodeState::Failed {
            return;
        }
        let from = self.state;
        warn!(device = %self.id, %from, ?cause, at_ms = now, "Node failed");
        self.drafts.push(EventDraft::failure(&self.id, from, cause));
        self.state = NodeState::Failed;
        self.failure = Some(cause);
        self.entered_at = now;
        self.routes.clear();
        self.routes_dirty = false;
        for port in &mut self.ports {
            port.acked = false;
            port.last_hello_at = None;
        }
    }

    fn transition(&mut self, to: NodeState, kind: EventKind, now: u64) {
        let from = self.state;
        debug!(device = %self.id, %from, %to, at_ms = now, "State transition");
        self.drafts
            .push(EventDraft::transition(&self.id, kind, from, to));
        self.state = to;
        self.entered_at = now;
    }

    fn port_index(&self, link: LinkId) -> Option<usize> {
        self.ports.iter().position(|p| p.port.link() == link)
    }

    fn discard_inbound(&mut self, now: u64) {
        for port in &self.ports {
            let ignored = port.port.receive(now).len() as u64;
            self.stats.messages_received += ignored;
            self.stats.messages_ignored += ignored;
        }
    }

    fn validate(&self, index: usize, envelope: &Envelope) -> Result<(), ActorError> {
        let port = &self.ports[index].port;
        if envelope.from != port.peer() {
            return Err(ActorError::UnexpectedSender {
                link: port.link().to_string(),
                claimed: envelope.from.clone(),
                expected: port.peer().to_string(),
            });
        }
        match &envelope.payload {
            Payload::Corrupted => Err(ActorError::CorruptedPayload {
                link: port.link().to_string(),
            }),
            Payload::RouteAdvert { routes } => match routes.iter().find(|r| r.metric >= INFINITY) {
                Some(route) => Err(ActorError::MetricOutOfRange {
                    metric: route.metric,
                }),
                None => Ok(()),
            },
            Payload::Hello | Payload::HelloAck => Ok(()),
        }
    }

    fn process_inbound(&mut self, now: u64) -> Result<(), ActorError> {
        for index in 0..self.ports.len() {
            let inbound = self.ports[index].port.receive(now);
            for envelope in inbound {
                self.stats.messages_received += 1;
                self.validate(index, &envelope)?;
                let established =
                    matches!(self.state, NodeState::Converging | NodeState::Operational);
                match envelope.payload {
                    Payload::Hello => {
                        self.send(index, Payload::HelloAck, now);
                        // A hello from an acked neighbour means it is rediscovering.
                        if established {
                            self.advertise(index, now);
                        }
                    }
                    Payload::HelloAck => {
                        if !self.ports[index].acked {
                            self.ports[index].acked = true;
                            if established {
                                self.advertise(index, now);
                            }
                        }
                    }
                    Payload::RouteAdvert { routes } => self.learn(index, &routes, now),
                    Payload::Corrupted => {}
                }
            }
        }
        Ok(())
    }

    fn send_due_hellos(&mut self, now: u64) {
        let interval = self.timings.hello_interval_ms;
        for index in 0..self.ports.len() {
            let port = &self.ports[index];
            let due = port.up
                && !port.acked
                && port
                    .last_hello_at
                    .map_or(true, |at| now >= at + interval);
            if due {
                self.ports[index].last_hello_at = Some(now);
                self.stats.hellos_sent += 1;
                self.send(index, Payload::Hello, now);
            }
        }
    }

    fn send(&mut self, index: usize, payload: Payload, now: u64) {
        let port = &self.ports[index];
        if !port.up {
            return;
        }
        self.stats.messages_sent += 1;
        if let SendOutcome::Dropped(reason) = port.port.send(now, payload) {
            self.stats.messages_dropped += 1;
            debug!(
                device = %self.id,
                interface = port.port.local_interface(),
                link = %port.port.link(),
                ?reason,
                "Message dropped"
            );
        }
    }

    /// Full table minus routes learned over the port itself.
    fn advertise(&mut self, index: usize, now: u64) {
        let link = self.ports[index].port.link();
        let routes: Vec<RouteEntry> = self
            .routes
            .values()
            .filter(|r| r.via != Some(link))
            .map(|r| RouteEntry {
                destination: r.destination,
                metric: r.metric,
            })
            .collect();
        self.stats.adverts_sent += 1;
        self.send(index, Payload::RouteAdvert { routes }, now);
    }

    fn advertise_all(&mut self, now: u64) {
        for index in 0..self.ports.len() {
            if self.ports[index].up && self.ports[index].acked {
                self.advertise(index, now);
            }
        }
    }

    fn learn(&mut self, index: usize, routes: &[RouteEntry], now: u64) {
        let link = self.ports[index].port.link();
        let peer = self.ports[index].port.peer().to_string();
        for entry in routes {
            let metric = entry.metric.saturating_add(1);
            if metric >= INFINITY {
                continue;
            }
            let key = route_key(&entry.destination);
            if self.routes.get(&key).is_some_and(|r| r.metric <= metric) {
                continue;
            }
            self.routes.insert(
                key,
                Route {
                    destination: entry.destination,
                    metric,
                    via: Some(link),
                    next_hop: Some(peer.clone()),
                },
            );
            self.drafts.push(EventDraft {
                device: Some(self.id.clone()),
                kind: EventKind::RouteLearned,
                detail: EventDetail::Route {
                    destination: entry.destination,
                    metric,
                    via: Some(peer.clone()),
                },
            });
            self.stats.routes_learned += 1;
            self.routes_dirty = true;
            self.last_route_change_at = now;
        }
    }

    fn withdraw_via(&mut self, link: LinkId, now: u64) {
        let lost: Vec<RouteKey> = self
            .routes
            .iter()
            .filter(|(_, r)| r.via == Some(link))
            .map(|(k, _)| *k)
            .collect();
        for key in lost {
            if let Some(route) = self.routes.remove(&key) {
                self.drafts.push(EventDraft {
                    device: Some(self.id.clone()),
                    kind: EventKind::RouteWithdrawn,
                    detail: EventDetail::Route {
                        destination: route.destination,
                        metric: route.metric,
                        via: route.next_hop,
                    },
                });
                self.stats.routes_withdrawn += 1;
                self.routes_dirty = true;
                self.last_route_change_at = now;
            }
        }
    }

    fn install_connected(&mut self, index: usize) {
        let subnet = self.ports[index].subnet;
        self.routes.insert(
            route_key(&subnet),
            Route {
                destination: subnet,
                metric: 0,
                via: None,
                next_hop: None,
            },
        );
    }

    /// Removes the connected route of a port unless another live port sits
    /// in the same subnet.
    fn drop_connected(&mut self, index: usize) {
        let subnet = self.ports[index].subnet;
        let still_attached = self
            .ports
            .iter()
            .enumerate()
            .any(|(i, p)| i != index && p.up && p.subnet == subnet);
        let key = route_key(&subnet);
        if !still_attached && self.routes.get(&key).is_some_and(|r| r.via.is_none()) {
            self.routes.remove(&key);
            self.routes_dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use netforge_config::NetworkModelConfig;
    use netforge_core::model::{Device, DeviceKind, Interface};
    use netforge_core::topology::{build, Topology};
    use std::net::Ipv4Addr;
    use tracing_test::traced_test;

    const TIMINGS: NodeTimings = NodeTimings {
        boot_ms: 2,
        hello_interval_ms: 5,
        convergence_window_ms: 4,
    };

    fn chain() -> Topology {
        let p2p = |net: u8, host: u8| {
            Interface::new(format!("Gi0/{net}")).with_address(Ipv4Addr::new(10, 0, net, host), 30)
        };
        build(&[
            Device::new("R1", DeviceKind::Router).with_interface(p2p(1, 1)),
            Device::new("R2", DeviceKind::Router)
                .with_interface(p2p(1, 2))
                .with_interface(p2p(2, 1)),
            Device::new("R3", DeviceKind::Router).with_interface(p2p(2, 2)),
        ])
    }

    fn actors(topology: &Topology, transport: &Transport) -> Vec<NodeActor> {
        topology
            .devices
            .iter()
            .map(|d| {
                let ports = transport
                    .ports_for(topology, &d.id)
                    .into_iter()
                    .map(|p| {
                        let subnet = topology.links[p.link().0].subnet;
                        (p, subnet)
                    })
                    .collect();
                NodeActor::new(d.id.clone(), ports, TIMINGS)
            })
            .collect()
    }

    fn instant() -> NetworkModelConfig {
        NetworkModelConfig {
            latency_ms: 0,
            jitter_ms: 0,
            loss_probability: 0.0,
        }
    }

    /// Ticks every actor once per ms, sequentially, starting them all at 0.
    fn drive(nodes: &mut [NodeActor], until: u64) -> Vec<EventDraft> {
        let mut events = Vec::new();
        for now in 0..until {
            for node in nodes.iter_mut() {
                let controls = if now == 0 { vec![Control::Start] } else { Vec::new() };
                events.extend(node.tick(now, controls));
            }
        }
        events
    }

    #[test]
    fn chain_reaches_operational_with_full_routes() {
        let topology = chain();
        let transport = Transport::new(&topology, &instant(), 1);
        let mut nodes = actors(&topology, &transport);
        drive(&mut nodes, 60);
        for node in &nodes {
            assert_eq!(node.state(), NodeState::Operational, "{}", node.id());
            assert_eq!(node.routes().count(), 2, "{}", node.id());
        }
    }

    #[test]
    fn every_transition_emits_one_event() {
        let topology = chain();
        let transport = Transport::new(&topology, &instant(), 1);
        let mut nodes = actors(&topology, &transport);
        let events = drive(&mut nodes, 60);
        for kind in [
            EventKind::Started,
            EventKind::InterfacesUp,
            EventKind::NeighborsDiscovered,
            EventKind::Converged,
        ] {
            assert_eq!(events.iter().filter(|e| e.kind == kind).count(), 3, "{kind}");
        }
    }

    #[test]
    fn node_without_ports_converges_alone() {
        let mut node = NodeActor::new("lonely", Vec::new(), TIMINGS);
        let mut kinds = Vec::new();
        for now in 0..20 {
            let controls = if now == 0 { vec![Control::Start] } else { Vec::new() };
            kinds.extend(node.tick(now, controls).into_iter().map(|e| e.kind));
        }
        assert_eq!(node.state(), NodeState::Operational);
        assert_eq!(
            kinds,
            vec![
                EventKind::Started,
                EventKind::InterfacesUp,
                EventKind::NeighborsDiscovered,
                EventKind::Converged
            ]
        );
    }

    #[test]
    fn losing_last_link_fails_and_restoring_it_recovers() {
        let topology = chain();
        let transport = Transport::new(&topology, &instant(), 1);
        let mut nodes = actors(&topology, &transport);
        drive(&mut nodes, 60);

        let link = topology.links_between("R1", "R2")[0];
        transport.set_link_up(link, false);
        let r1 = &mut nodes[0];
        let events = r1.tick(60, vec![Control::LinkDown(link)]);
        assert_eq!(r1.state(), NodeState::Failed);
        assert_eq!(r1.report().failure, Some(FailureCause::LastLinkLost));
        assert!(events.iter().any(|e| e.kind == EventKind::RouteWithdrawn));

        let r2 = &mut nodes[1];
        r2.tick(60, vec![Control::LinkDown(link)]);
        assert_eq!(r2.state(), NodeState::Operational);

        transport.set_link_up(link, true);
        let events = nodes[0].tick(61, vec![Control::LinkUp(link)]);
        assert_eq!(events[0].kind, EventKind::Restored);
        assert_eq!(nodes[0].state(), NodeState::Recovering);
        nodes[0].tick(62, Vec::new());
        assert_eq!(nodes[0].state(), NodeState::Discovering);
    }

    #[test]
    fn corrupted_message_fails_receiver_only() {
        let topology = chain();
        let transport = Transport::new(&topology, &instant(), 1);
        let mut nodes = actors(&topology, &transport);
        drive(&mut nodes, 60);

        let link = topology.links_between("R1", "R2")[0];
        transport.inject_corrupted(link, "R1", 60);
        let events = nodes[1].tick(61, Vec::new());
        assert_eq!(nodes[1].state(), NodeState::Failed);
        assert_eq!(events.last().and_then(|e| match e.detail {
            EventDetail::Failure { cause, .. } => Some(cause),
            _ => None,
        }), Some(FailureCause::Malformed));
        nodes[0].tick(61, Vec::new());
        assert_eq!(nodes[0].state(), NodeState::Operational);
    }

    #[test]
    fn failed_node_ignores_traffic_until_restored() {
        let topology = chain();
        let transport = Transport::new(&topology, &instant(), 1);
        let mut nodes = actors(&topology, &transport);
        drive(&mut nodes, 60);

        let events = nodes[1].tick(60, vec![Control::Fail]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Failed);
        assert!(nodes[1].tick(61, vec![Control::Fail]).is_empty());

        let events = nodes[1].tick(62, vec![Control::Restore]);
        assert_eq!(events[0].kind, EventKind::Restored);
    }

    #[test]
    fn restore_with_every_link_down_fails_again() {
        let topology = chain();
        let transport = Transport::new(&topology, &instant(), 1);
        let mut nodes = actors(&topology, &transport);
        drive(&mut nodes, 60);

        let link = topology.links_between("R1", "R2")[0];
        let r1 = &mut nodes[0];
        r1.tick(60, vec![Control::Fail]);
        transport.set_link_up(link, false);
        assert!(r1.tick(61, vec![Control::LinkDown(link)]).is_empty());

        r1.tick(62, vec![Control::Restore]);
        assert_eq!(r1.state(), NodeState::Recovering);
        let events = r1.tick(63, Vec::new());
        assert_eq!(r1.state(), NodeState::Failed);
        assert_eq!(r1.report().failure, Some(FailureCause::LastLinkLost));
        assert!(events.iter().all(|e| e.kind != EventKind::InterfacesUp));

        transport.set_link_up(link, true);
        let events = r1.tick(64, vec![Control::LinkUp(link)]);
        assert_eq!(events[0].kind, EventKind::Restored);
        r1.tick(65, Vec::new());
        assert_eq!(r1.state(), NodeState::Discovering);
    }

    #[test]
    #[traced_test]
    fn link_changes_log_the_local_interface() {
        let topology = chain();
        let transport = Transport::new(&topology, &instant(), 1);
        let mut nodes = actors(&topology, &transport);
        drive(&mut nodes, 60);

        let link = topology.links_between("R2", "R3")[0];
        transport.set_link_up(link, false);
        nodes[1].tick(60, vec![Control::LinkDown(link)]);
        assert!(logs_contain("Interface down"));
        assert!(logs_contain("Gi0/2"));
        assert_eq!(nodes[1].state(), NodeState::Operational);
    }
}
