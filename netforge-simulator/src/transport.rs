//! In-process IPC between node actors.
//!
//! Every topology link becomes a [`Channel`] with one [`Lane`] per direction.
//! A lane has exactly one sending actor and one receiving actor, delivers in
//! FIFO order, and applies its own seeded latency, jitter and loss. Actors
//! only ever hold the [`Port`]s of their incident links, so there is no way
//! to address a device that is not a direct neighbour.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use netforge_config::NetworkModelConfig;
use netforge_core::topology::{LinkId, Topology};

use crate::message::{Envelope, Payload};
use crate::network_simulation::{congested, LinkConditions};

/// Direction of travel on a link: `AtoB` follows the link's endpoint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    AtoB,
    BtoA,
}

impl Direction {
    fn index(self) -> usize {
        match self {
            Direction::AtoB => 0,
            Direction::BtoA => 1,
        }
    }

    fn reverse(self) -> Self {
        match self {
            Direction::AtoB => Direction::BtoA,
            Direction::BtoA => Direction::AtoB,
        }
    }
}

/// What happened to a message handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued { deliver_at: u64 },
    Dropped(DropReason),
}

/// Why a message never made it onto a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Loss,
    LinkDown,
    Closed,
}

/// Counters of one lane, or summed over the whole transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStats {
    pub sent: u64,
    pub delivered: u64,
    pub dropped_loss: u64,
    pub dropped_link_down: u64,
    pub dropped_closed: u64,
    pub corrupted: u64,
    pub bytes: u64,
}

impl TransportStats {
    /// Drops for any reason.
    pub fn dropped(&self) -> u64 {
        self.dropped_loss + self.dropped_link_down + self.dropped_closed
    }

    fn merge(&mut self, other: &TransportStats) {
        self.sent += other.sent;
        self.delivered += other.delivered;
        self.dropped_loss += other.dropped_loss;
        self.dropped_link_down += other.dropped_link_down;
        self.dropped_closed += other.dropped_closed;
        self.corrupted += other.corrupted;
        self.bytes += other.bytes;
    }
}

/// Utilization of one link over one sampling interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSample {
    pub link: LinkId,
    pub at_ms: u64,
    pub bytes: u64,
    pub utilization: f64,
}

#[derive(Debug)]
struct InFlight {
    deliver_at: u64,
    envelope: Envelope,
}

#[derive(Debug)]
struct LaneState {
    queue: VecDeque<InFlight>,
    conditions: LinkConditions,
    seed: u64,
    reconfigured: u64,
    last_deliver_at: u64,
    bytes_in_window: u64,
    stats: TransportStats,
}

#[derive(Debug)]
struct Lane {
    state: Mutex<LaneState>,
}

impl Lane {
    fn new(network: &NetworkModelConfig, seed: u64) -> Self {
        Self {
            state: Mutex::new(LaneState {
                queue: VecDeque::new(),
                conditions: LinkConditions::from_config(network, seed),
                seed,
                reconfigured: 0,
                last_deliver_at: 0,
                bytes_in_window: 0,
                stats: TransportStats::default(),
            }),
        }
    }
}

/// Both directions of one link.
#[derive(Debug)]
pub struct Channel {
    link: LinkId,
    ends: [String; 2],
    capacity_bps: u64,
    up: AtomicBool,
    congestion: AtomicU8,
    lanes: [Lane; 2],
}

impl Channel {
    /// Replaces the conditions of both lanes. Each change reseeds the lanes
    /// from their own seed, so a replayed run draws the same sequence.
    fn set_conditions(&self, network: &NetworkModelConfig) {
        for lane in &self.lanes {
            let mut lane = lane.state.lock();
            lane.reconfigured += 1;
            let seed = lane.seed ^ lane.reconfigured.wrapping_mul(0x9e37_79b9_7f4a_7c15);
            lane.conditions = LinkConditions::from_config(network, seed);
        }
    }

    fn stats(&self) -> TransportStats {
        let mut total = TransportStats::default();
        for lane in &self.lanes {
            total.merge(&lane.state.lock().stats);
        }
        total
    }

    fn end(&self, direction: Direction) -> &str {
        &self.ends[direction.index()]
    }

    fn enqueue(
        &self,
        direction: Direction,
        now_ms: u64,
        envelope: Envelope,
        apply_loss: bool,
        closed: bool,
    ) -> SendOutcome {
        let mut lane = self.lanes[direction.index()].state.lock();
        let bytes = envelope.payload.wire_bytes();
        lane.stats.sent += 1;
        if closed {
            lane.stats.dropped_closed += 1;
            return SendOutcome::Dropped(DropReason::Closed);
        }
        if !self.up.load(Ordering::Acquire) {
            lane.stats.dropped_link_down += 1;
            return SendOutcome::Dropped(DropReason::LinkDown);
        }
        let transit = match lane.conditions.transit_ms() {
            Some(ms) => ms,
            None if apply_loss => {
                lane.stats.dropped_loss += 1;
                return SendOutcome::Dropped(DropReason::Loss);
            }
            None => 0,
        };
        // At least one tick in flight, and never ahead of the previous message.
        let deliver_at = (now_ms + transit.max(1)).max(lane.last_deliver_at);
        lane.last_deliver_at = deliver_at;
        lane.bytes_in_window += bytes;
        lane.stats.bytes += bytes;
        if envelope.payload == Payload::Corrupted {
            lane.stats.corrupted += 1;
        }
        lane.queue.push_back(InFlight {
            deliver_at,
            envelope,
        });
        SendOutcome::Queued { deliver_at }
    }
}

/// The capability an actor holds for one incident link.
#[derive(Debug, Clone)]
pub struct Port {
    channel: Arc<Channel>,
    outbound: Direction,
    local: String,
    local_interface: String,
    closed: Arc<AtomicBool>,
}

impl Port {
    /// The link this port sits on.
    pub fn link(&self) -> LinkId {
        self.channel.link
    }

    /// Device at the far end.
    pub fn peer(&self) -> &str {
        self.channel.end(self.outbound.reverse())
    }

    /// Name of the owning device's interface on this link.
    pub fn local_interface(&self) -> &str {
        &self.local_interface
    }

    /// Current administrative state of the link.
    pub fn is_up(&self) -> bool {
        self.channel.up.load(Ordering::Acquire)
    }

    /// Queues `payload` towards the peer. Loss applies here.
    pub fn send(&self, now_ms: u64, payload: Payload) -> SendOutcome {
        let envelope = Envelope {
            from: self.local.clone(),
            link: self.channel.link,
            payload,
        };
        let closed = self.closed.load(Ordering::Acquire);
        let outcome = self
            .channel
            .enqueue(self.outbound, now_ms, envelope, true, closed);
        trace!(link = %self.channel.link, from = %self.local, ?outcome, "send");
        outcome
    }

    /// Messages due at or before `now_ms`, in send order.
    pub fn receive(&self, now_ms: u64) -> Vec<Envelope> {
        let mut lane = self.channel.lanes[self.outbound.reverse().index()].state.lock();
        let mut due = Vec::new();
        while lane.queue.front().is_some_and(|m| m.deliver_at <= now_ms) {
            if let Some(message) = lane.queue.pop_front() {
                due.push(message.envelope);
            }
        }
        lane.stats.delivered += due.len() as u64;
        due
    }
}

/// Every channel of a topology, plus the close flag shared by all ports.
#[derive(Debug)]
pub struct Transport {
    channels: Vec<Arc<Channel>>,
    closed: Arc<AtomicBool>,
    base: NetworkModelConfig,
}

impl Transport {
    /// One channel per link, all starting up with `network` conditions.
    /// Lane seeds derive from `seed` and the link id.
    pub fn new(topology: &Topology, network: &NetworkModelConfig, seed: u64) -> Self {
        let channels = topology
            .links
            .iter()
            .map(|link| {
                let lane_seed = |direction: u64| {
                    seed ^ (link.id.0 as u64 + 1).wrapping_mul(0x2545_f491_4f6c_dd1d) ^ direction
                };
                Arc::new(Channel {
                    link: link.id,
                    ends: [link.a.device.clone(), link.b.device.clone()],
                    capacity_bps: link.capacity_bps,
                    up: AtomicBool::new(true),
                    congestion: AtomicU8::new(0),
                    lanes: [
                        Lane::new(network, lane_seed(0)),
                        Lane::new(network, lane_seed(1)),
                    ],
                })
            })
            .collect();
        Self {
            channels,
            closed: Arc::new(AtomicBool::new(false)),
            base: network.clone(),
        }
    }

    /// Ports of `device`, in link id order.
    pub fn ports_for(&self, topology: &Topology, device: &str) -> Vec<Port> {
        topology
            .incident_links(device)
            .filter_map(|link| {
                let channel = self.channels.get(link.id.0)?;
                let (outbound, endpoint) = if link.a.device == device {
                    (Direction::AtoB, &link.a)
                } else {
                    (Direction::BtoA, &link.b)
                };
                Some(Port {
                    channel: Arc::clone(channel),
                    outbound,
                    local: device.to_string(),
                    local_interface: endpoint.interface.clone(),
                    closed: Arc::clone(&self.closed),
                })
            })
            .collect()
    }

    /// Whether `link` exists and is up.
    pub fn is_up(&self, link: LinkId) -> bool {
        self.channels
            .get(link.0)
            .is_some_and(|c| c.up.load(Ordering::Acquire))
    }

    /// Changes a link's state. Taking it down drops everything in flight.
    /// Returns false if the link was already in that state.
    pub fn set_link_up(&self, link: LinkId, up: bool) -> bool {
        let Some(channel) = self.channels.get(link.0) else {
            return false;
        };
        if channel.up.swap(up, Ordering::AcqRel) == up {
            return false;
        }
        if !up {
            for lane in &channel.lanes {
                let mut lane = lane.state.lock();
                let purged = lane.queue.len() as u64;
                lane.queue.clear();
                lane.stats.dropped_link_down += purged;
            }
        }
        true
    }

    /// Loads `link` to `level_percent` (1 to 100), raising latency and loss
    /// in both directions. Returns false for an unknown link or a level
    /// already in place.
    pub fn congest(&self, link: LinkId, level_percent: u8) -> bool {
        let Some(channel) = self.channels.get(link.0) else {
            return false;
        };
        let level = level_percent.clamp(1, 100);
        if channel.congestion.swap(level, Ordering::AcqRel) == level {
            return false;
        }
        channel.set_conditions(&congested(&self.base, level));
        true
    }

    /// Puts `link` back on the configured conditions. Returns false if it was
    /// not congested.
    pub fn clear_congestion(&self, link: LinkId) -> bool {
        let Some(channel) = self.channels.get(link.0) else {
            return false;
        };
        if channel.congestion.swap(0, Ordering::AcqRel) == 0 {
            return false;
        }
        channel.set_conditions(&self.base);
        true
    }

    /// Current congestion level of `link`, 0 when uncongested.
    pub fn congestion(&self, link: LinkId) -> u8 {
        self.channels
            .get(link.0)
            .map_or(0, |c| c.congestion.load(Ordering::Acquire))
    }

    /// Queues a corrupted frame from `from` towards the other end of `link`.
    /// Loss does not apply; a down link or closed transport still drops it.
    pub fn inject_corrupted(&self, link: LinkId, from: &str, now_ms: u64) -> SendOutcome {
        let Some(channel) = self.channels.get(link.0) else {
            return SendOutcome::Dropped(DropReason::LinkDown);
        };
        let direction = if channel.ends[0] == from {
            Direction::AtoB
        } else {
            Direction::BtoA
        };
        let envelope = Envelope {
            from: from.to_string(),
            link,
            payload: Payload::Corrupted,
        };
        let closed = self.closed.load(Ordering::Acquire);
        channel.enqueue(direction, now_ms, envelope, false, closed)
    }

    /// Stops accepting messages.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the current sampling window on every link.
    pub fn sample(&self, now_ms: u64, interval_ms: u64) -> Vec<LinkSample> {
        self.channels
            .iter()
            .map(|channel| {
                let mut busiest = 0;
                for lane in &channel.lanes {
                    let mut lane = lane.state.lock();
                    busiest = busiest.max(lane.bytes_in_window);
                    lane.bytes_in_window = 0;
                }
                let window_bits = channel.capacity_bps as f64 * interval_ms as f64 / 1000.0;
                let utilization = if window_bits > 0.0 {
                    (busiest as f64 * 8.0 / window_bits).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                LinkSample {
                    link: channel.link,
                    at_ms: now_ms,
                    bytes: busiest,
                    utilization,
                }
            })
            .collect()
    }

    /// Counters summed over every lane.
    pub fn stats(&self) -> TransportStats {
        let mut total = TransportStats::default();
        for channel in &self.channels {
            total.merge(&channel.stats());
        }
        total
    }

    /// Counters of both directions of one link.
    pub fn link_stats(&self, link: LinkId) -> Option<TransportStats> {
        self.channels.get(link.0).map(|c| c.stats())
    }

    /// Messages still queued on any lane.
    pub fn in_flight(&self) -> usize {
        self.channels
            .iter()
            .flat_map(|c| c.lanes.iter())
            .map(|l| l.state.lock().queue.len())
            .sum()
    }
}
