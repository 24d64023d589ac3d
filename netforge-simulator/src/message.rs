//! Protocol messages exchanged between node actors.

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use netforge_core::topology::LinkId;

/// Hop count treated as unreachable.
pub const INFINITY: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub destination: Ipv4Network,
    pub metric: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Hello,
    HelloAck,
    RouteAdvert { routes: Vec<RouteEntry> },
    /// What is left of a frame mangled in transit.
    Corrupted,
}

impl Payload {
    /// Nominal wire size, used for link utilization samples.
    pub fn wire_bytes(&self) -> u64 {
        match self {
            Payload::Hello | Payload::HelloAck => 64,
            Payload::RouteAdvert { routes } => 32 + 8 * routes.len() as u64,
            Payload::Corrupted => 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub link: LinkId,
    pub payload: Payload,
}
