//! Simulation engine.
//!
//! Drives one actor thread per device through lock-step rounds on a logical
//! clock. A round is:
//!
//! 1. honour pause/stop, check completion and timeout
//! 2. open the round in the event log
//! 3. sample links, roll chaos, fire due scenario actions (engine slot 0)
//! 4. tick every participating actor (slots 1..)
//! 5. wait for all commits, writing off actors that miss the deadline
//! 6. fold the round's events into the engine's view of device states
//! 7. advance the clock
//!
//! Nothing in a round depends on wall time except the hung-actor deadline,
//! so a given seed always produces the same event sequence.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, info, instrument, warn};

use netforge_config::SimulatorConfig;
use netforge_core::topology::{LinkId, Topology};
use netforge_telemetry::MetricsRecorder;

use crate::barrier::SimulationController;
use crate::chaos::ChaosMonkey;
use crate::error::SimulationError;
use crate::event_log::EventLog;
use crate::events::{EventDetail, EventDraft, EventKind};
use crate::node::{ActorCommand, ActorReport, Control, NodeActor, NodeTimings};
use crate::result::{fingerprint, ActorFault, Completion, SimulationResult, Statistics};
use crate::scenario::{Scenario, ScenarioAction, ScheduledAction};
use crate::state::{FailureCause, NodeState};
use crate::transport::{LinkSample, SendOutcome, Transport};
use crate::virtual_clock::VirtualClock;

/// Owns a topology snapshot and the settings for running scenarios on it.
/// Each [`run`](Self::run) builds a fresh transport and actor set.
pub struct SimulationEngine {
    topology: Topology,
    config: SimulatorConfig,
    controller: SimulationController,
    metrics: Option<MetricsRecorder>,
}

impl SimulationEngine {
    pub fn new(topology: &Topology, config: SimulatorConfig) -> Self {
        Self {
            topology: topology.clone(),
            config,
            controller: SimulationController::new(),
            metrics: None,
        }
    }

    /// Feeds round, event and drop counters to `metrics`.
    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Handle for pausing, resuming or stopping a run from another thread.
    /// A stop is sticky: later runs on this engine stop immediately.
    pub fn controller(&self) -> SimulationController {
        self.controller.clone()
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Runs `scenario` to completion, timeout or stop. Rejected actions and
    /// hung actors end up in the result rather than as errors; only failing
    /// to spawn an actor thread is an error.
    #[instrument(skip_all, fields(scenario = %scenario.name(), seed = self.config.seed))]
    pub fn run(&self, scenario: &Scenario) -> Result<SimulationResult, SimulationError> {
        let started = Instant::now();
        let mut run = Run::spawn(self)?;
        info!(
            devices = run.actors.len(),
            links = self.topology.links.len(),
            "Simulation started"
        );

        self.controller.barrier().begin_run();
        let completion = run.drive(scenario);
        self.controller.barrier().end_run();

        let result = run.finish(scenario, completion, started.elapsed());
        info!(
            completion = ?result.completion,
            events = result.events.len(),
            logical_ms = result.logical_duration_ms,
            faults = result.actor_faults.len(),
            "Simulation finished"
        );
        Ok(result)
    }
}

/// Runs `scenario` on a fresh engine.
pub fn run(
    topology: &Topology,
    scenario: &Scenario,
    config: SimulatorConfig,
) -> Result<SimulationResult, SimulationError> {
    SimulationEngine::new(topology, config).run(scenario)
}

struct ActorHandle {
    device: String,
    mailbox: Sender<ActorCommand>,
    thread: Option<JoinHandle<()>>,
    hung: bool,
}

struct Run<'a> {
    engine: &'a SimulationEngine,
    transport: Transport,
    log: Arc<EventLog>,
    clock: VirtualClock,
    chaos: ChaosMonkey,
    actors: Vec<ActorHandle>,
    index: BTreeMap<String, usize>,
    reports: Receiver<ActorReport>,
    states: BTreeMap<String, NodeState>,
    actor_faults: Vec<ActorFault>,
    samples: Vec<LinkSample>,
    cursor: usize,
    last_event_at: u64,
    round: u64,
}

impl<'a> Run<'a> {
    fn spawn(engine: &'a SimulationEngine) -> Result<Self, SimulationError> {
        let topology = &engine.topology;
        let config = &engine.config;
        let transport = Transport::new(topology, &config.network, config.seed);
        let log = Arc::new(EventLog::new());
        let timings = NodeTimings::from(config);
        let (done_tx, reports) = channel::unbounded();

        let mut devices: Vec<&str> = topology.devices.iter().map(|d| d.id.as_str()).collect();
        devices.sort_unstable();
        devices.dedup();

        let mut actors = Vec::with_capacity(devices.len());
        let mut index = BTreeMap::new();
        let mut states = BTreeMap::new();
        for device in devices {
            let ports = transport
                .ports_for(topology, device)
                .into_iter()
                .filter_map(|port| {
                    let subnet = topology.link(port.link())?.subnet;
                    Some((port, subnet))
                })
                .collect();
            let actor = NodeActor::new(device, ports, timings);
            let (mailbox, inbox) = channel::unbounded();
            let log = Arc::clone(&log);
            let done = done_tx.clone();
            let thread = thread::Builder::new()
                .name(format!("actor-{device}"))
                .spawn(move || actor.run(inbox, log, done))
                .map_err(|source| SimulationError::Spawn {
                    device: device.to_string(),
                    source,
                })?;
            index.insert(device.to_string(), actors.len());
            states.insert(device.to_string(), NodeState::Offline);
            actors.push(ActorHandle {
                device: device.to_string(),
                mailbox,
                thread: Some(thread),
                hung: false,
            });
        }

        Ok(Self {
            engine,
            transport,
            log,
            clock: VirtualClock::new(0),
            chaos: ChaosMonkey::new(&config.chaos, config.seed),
            actors,
            index,
            reports,
            states,
            actor_faults: Vec::new(),
            samples: Vec::new(),
            cursor: 0,
            last_event_at: 0,
            round: 0,
        })
    }

    fn drive(&mut self, scenario: &Scenario) -> Completion {
        let engine = self.engine;
        let config = &engine.config;
        let controller = &engine.controller;
        let script: Vec<ScheduledAction> = match scenario {
            Scenario::Day1 => Vec::new(),
            Scenario::Day2(script) => script.ordered(),
        };
        let mut next_action = 0;
        let mut warmup_end: Option<u64> = None;
        let mut next_sample_at = config.sample_interval_ms;

        loop {
            controller.barrier().checkpoint();
            if controller.is_stopped() {
                info!(round = self.round, "Stop requested");
                return Completion::Stopped;
            }

            let now = self.clock.now_ms();
            let converged = self.states.values().all(|s| *s == NodeState::Operational);
            match scenario {
                Scenario::Day1 if converged => return Completion::Complete,
                Scenario::Day1 => {}
                Scenario::Day2(_) => {
                    if warmup_end.is_none() && converged {
                        info!(at_ms = now, "Warm-up complete");
                        warmup_end = Some(now);
                    }
                    if warmup_end.is_some()
                        && next_action == script.len()
                        && now >= self.last_event_at + config.quiescence_window_ms
                    {
                        return Completion::Complete;
                    }
                }
            }
            if now >= config.timeout_ms {
                warn!(at_ms = now, "Simulation timed out");
                return Completion::TimedOut;
            }

            self.round += 1;
            let round_started = Instant::now();
            let participants: Vec<usize> = (0..self.actors.len())
                .filter(|i| !self.actors[*i].hung)
                .collect();
            self.log
                .open_round(self.round, now, participants.len() + 1);

            if now >= next_sample_at {
                self.samples
                    .extend(self.transport.sample(now, config.sample_interval_ms));
                next_sample_at += config.sample_interval_ms;
            }

            let mut drafts = Vec::new();
            if self.round == 1 {
                for i in 0..self.actors.len() {
                    self.control(i, Control::Start);
                }
            }
            self.roll_chaos(now, &mut drafts);
            if let Some(end) = warmup_end {
                while next_action < script.len() && end + script[next_action].at_ms <= now {
                    self.apply(&script[next_action].action, now, &mut drafts);
                    next_action += 1;
                }
            }
            self.log.commit(self.round, 0, drafts);

            for (slot, &i) in participants.iter().enumerate() {
                let tick = ActorCommand::Tick {
                    round: self.round,
                    slot: slot + 1,
                    now_ms: now,
                };
                if self.actors[i].mailbox.send(tick).is_err() {
                    warn!(device = %self.actors[i].device, "Actor mailbox closed");
                }
            }

            let outcome = self.log.await_round(
                self.round,
                Duration::from_millis(config.round_deadline_ms),
            );
            for slot in outcome.missed_slots {
                if let Some(&i) = slot.checked_sub(1).and_then(|s| participants.get(s)) {
                    self.write_off(i, now);
                }
            }

            self.absorb_events();
            if let Some(metrics) = &self.engine.metrics {
                metrics.record_round(round_started.elapsed());
            }
            self.clock.advance(config.tick_ms);
        }
    }

    /// Marks an actor hung and excludes it from later rounds.
    fn write_off(&mut self, i: usize, now: u64) {
        let actor = &mut self.actors[i];
        actor.hung = true;
        let from = self
            .states
            .get(&actor.device)
            .copied()
            .unwrap_or(NodeState::Offline);
        warn!(device = %actor.device, at_ms = now, "Actor missed the round deadline");
        self.actor_faults.push(ActorFault {
            device: actor.device.clone(),
            cause: FailureCause::Hung,
            at_ms: now,
        });
        if let Some(metrics) = &self.engine.metrics {
            metrics.record_actor_fault();
        }
        self.log.append(vec![EventDraft::failure(
            &actor.device,
            from,
            FailureCause::Hung,
        )]);
    }

    fn absorb_events(&mut self) {
        for event in self.log.events_since(self.cursor) {
            self.cursor = event.seq as usize + 1;
            self.last_event_at = event.at_ms;
            if let Some(metrics) = &self.engine.metrics {
                metrics.record_event(event.kind.as_str());
            }
            let Some(device) = event.device.as_ref() else {
                continue;
            };
            if let Some(state) = event.resulting_state() {
                self.states.insert(device.clone(), state);
            }
            if let Some(cause) = event.failure_cause() {
                if cause.is_actor_fault() && cause != FailureCause::Hung {
                    self.actor_faults.push(ActorFault {
                        device: device.clone(),
                        cause,
                        at_ms: event.at_ms,
                    });
                    if let Some(metrics) = &self.engine.metrics {
                        metrics.record_actor_fault();
                    }
                }
            }
        }
    }

    fn control(&self, i: usize, control: Control) {
        let actor = &self.actors[i];
        if actor.hung {
            return;
        }
        if actor.mailbox.send(ActorCommand::Control(control)).is_err() {
            debug!(device = %actor.device, ?control, "Control not delivered");
        }
    }

    fn control_device(&self, device: &str, control: Control) {
        if let Some(&i) = self.index.get(device) {
            self.control(i, control);
        }
    }

    fn is_hung(&self, device: &str) -> bool {
        self.index
            .get(device)
            .is_some_and(|&i| self.actors[i].hung)
    }

    fn roll_chaos(&mut self, now: u64, drafts: &mut Vec<EventDraft>) {
        let engine = self.engine;
        let candidates: Vec<(LinkId, &str, &str)> = engine
            .topology
            .links
            .iter()
            .filter(|l| self.transport.is_up(l.id))
            .flat_map(|l| {
                [
                    (l.id, l.a.device.as_str(), l.b.device.as_str()),
                    (l.id, l.b.device.as_str(), l.a.device.as_str()),
                ]
            })
            .collect();
        if let Some(&(link, from, to)) = self.chaos.pick(&candidates) {
            info!(%link, from, to, at_ms = now, "Chaos corrupting a frame");
            self.transport.inject_corrupted(link, from, now);
            drafts.push(corruption(link, from, to));
        }
    }

    /// Applies one scenario action. Anything that cannot be applied becomes
    /// an `ActionRejected` event.
    fn apply(&mut self, action: &ScenarioAction, now: u64, drafts: &mut Vec<EventDraft>) {
        if let Err(reason) = self.try_apply(action, now, drafts) {
            warn!(%action, reason, "Scenario action rejected");
            drafts.push(EventDraft::rejected(action, reason));
        } else {
            debug!(%action, at_ms = now, "Scenario action applied");
        }
    }

    fn try_apply(
        &mut self,
        action: &ScenarioAction,
        now: u64,
        drafts: &mut Vec<EventDraft>,
    ) -> Result<(), &'static str> {
        match action {
            ScenarioAction::Start { device } => match self.state_of(device)? {
                NodeState::Offline => {
                    self.control_device(device, Control::Start);
                    Ok(())
                }
                _ => Err("device already started"),
            },
            ScenarioAction::FailDevice { device } => match self.state_of(device)? {
                NodeState::Failed => Err("device already failed"),
                NodeState::Offline => Err("device not started"),
                _ => {
                    self.control_device(device, Control::Fail);
                    Ok(())
                }
            },
            ScenarioAction::RestoreDevice { device } => match self.state_of(device)? {
                NodeState::Failed if self.is_hung(device) => Err("device unresponsive"),
                NodeState::Failed => {
                    self.control_device(device, Control::Restore);
                    Ok(())
                }
                _ => Err("device not failed"),
            },
            ScenarioAction::FailLink { a, b } => self.set_links(a, b, false, drafts),
            ScenarioAction::RestoreLink { a, b } => self.set_links(a, b, true, drafts),
            ScenarioAction::CorruptLink { from, to } => {
                if !self.chaos.enabled() {
                    return Err("chaos disabled");
                }
                let links = self.adjacent(from, to)?;
                let link = links
                    .into_iter()
                    .find(|l| self.transport.is_up(*l))
                    .ok_or("no link up")?;
                match self.transport.inject_corrupted(link, from, now) {
                    SendOutcome::Queued { .. } => {
                        drafts.push(corruption(link, from, to));
                        Ok(())
                    }
                    SendOutcome::Dropped(_) => Err("link refused frame"),
                }
            }
            ScenarioAction::Congest { a, b, level } => {
                if !(1..=100).contains(level) {
                    return Err("congestion level out of range");
                }
                let changed: Vec<LinkId> = self
                    .adjacent(a, b)?
                    .into_iter()
                    .filter(|l| self.transport.congest(*l, *level))
                    .collect();
                if changed.is_empty() {
                    return Err("link already congested");
                }
                for link in changed {
                    info!(%link, %a, %b, level, at_ms = now, "Link congested");
                    drafts.push(congestion(EventKind::LinkCongested, link, a, b, *level));
                }
                Ok(())
            }
            ScenarioAction::ClearCongestion { a, b } => {
                let cleared: Vec<LinkId> = self
                    .adjacent(a, b)?
                    .into_iter()
                    .filter(|l| self.transport.clear_congestion(*l))
                    .collect();
                if cleared.is_empty() {
                    return Err("link not congested");
                }
                for link in cleared {
                    drafts.push(congestion(EventKind::CongestionCleared, link, a, b, 0));
                }
                Ok(())
            }
        }
    }

    fn state_of(&self, device: &str) -> Result<NodeState, &'static str> {
        self.states.get(device).copied().ok_or("unknown device")
    }

    fn adjacent(&self, a: &str, b: &str) -> Result<Vec<LinkId>, &'static str> {
        if !self.states.contains_key(a) || !self.states.contains_key(b) {
            return Err("unknown device");
        }
        let links = self.engine.topology.links_between(a, b);
        if links.is_empty() {
            return Err("devices not adjacent");
        }
        Ok(links)
    }

    /// Changes every link between `a` and `b` that is not already in the
    /// requested state.
    fn set_links(
        &mut self,
        a: &str,
        b: &str,
        up: bool,
        drafts: &mut Vec<EventDraft>,
    ) -> Result<(), &'static str> {
        let links = self.adjacent(a, b)?;
        let changed: Vec<LinkId> = links
            .into_iter()
            .filter(|l| self.transport.set_link_up(*l, up))
            .collect();
        if changed.is_empty() {
            return Err(if up { "link already up" } else { "link already down" });
        }
        for link in changed {
            drafts.push(EventDraft {
                device: None,
                kind: if up { EventKind::LinkUp } else { EventKind::LinkDown },
                detail: EventDetail::Link {
                    link,
                    a: a.to_string(),
                    b: b.to_string(),
                },
            });
            let control = if up {
                Control::LinkUp(link)
            } else {
                Control::LinkDown(link)
            };
            self.control_device(a, control);
            self.control_device(b, control);
        }
        Ok(())
    }

    /// Stops every actor and gathers their reports.
    fn shutdown(&mut self) -> BTreeMap<String, ActorReport> {
        self.transport.close();
        for actor in &self.actors {
            if actor.mailbox.send(ActorCommand::Stop).is_err() {
                debug!(device = %actor.device, "Actor already gone");
            }
        }

        let grace = Duration::from_millis(self.engine.config.stop_grace_ms);
        let deadline = Instant::now() + grace;
        let mut reports = BTreeMap::new();
        while reports.len() < self.actors.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.reports.recv_timeout(remaining) {
                Ok(report) => {
                    reports.insert(report.device.clone(), report);
                }
                Err(_) => break,
            }
        }

        for actor in &mut self.actors {
            if reports.contains_key(&actor.device) {
                if let Some(thread) = actor.thread.take() {
                    if thread.join().is_err() {
                        warn!(device = %actor.device, "Actor thread panicked");
                    }
                }
            } else {
                warn!(device = %actor.device, "Actor did not report within the grace period");
            }
        }
        reports
    }

    fn finish(
        mut self,
        scenario: &Scenario,
        completion: Completion,
        wall_duration: Duration,
    ) -> SimulationResult {
        let undelivered = self.transport.in_flight();
        let reports = self.shutdown();
        let events = self.log.snapshot();

        let mut events_by_kind = BTreeMap::new();
        for event in &events {
            *events_by_kind.entry(event.kind).or_insert(0) += 1;
        }
        let transport = self.transport.stats();
        if let Some(metrics) = &self.engine.metrics {
            metrics.record_drops(transport.dropped());
        }
        let statistics = Statistics {
            events_by_kind,
            transport,
            nodes: reports
                .into_iter()
                .map(|(device, report)| (device, report.stats))
                .collect(),
            rounds: self.round,
            undelivered,
        };
        debug!(undelivered, rounds = self.round, "Transport drained");

        let fingerprint = fingerprint(&events, &self.states);
        SimulationResult {
            scenario: scenario.name().to_string(),
            final_states: self.states,
            events,
            statistics,
            link_samples: self.samples,
            actor_faults: self.actor_faults,
            logical_duration_ms: self.clock.now_ms(),
            wall_duration,
            completion,
            fingerprint,
        }
    }
}

fn corruption(link: LinkId, from: &str, to: &str) -> EventDraft {
    EventDraft {
        device: None,
        kind: EventKind::CorruptionInjected,
        detail: EventDetail::Corruption {
            link,
            from: from.to_string(),
            to: to.to_string(),
        },
    }
}

fn congestion(kind: EventKind, link: LinkId, a: &str, b: &str, level: u8) -> EventDraft {
    EventDraft {
        device: None,
        kind,
        detail: EventDetail::Congestion {
            link,
            a: a.to_string(),
            b: b.to_string(),
            level,
        },
    }
}
