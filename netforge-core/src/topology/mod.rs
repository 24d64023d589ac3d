//! ## netforge-core::topology
//! **Subnet-inferred device graph with hierarchy tiers**
//!
//! ### Key Submodules:
//! - `builder`: subnet indexing, link inference and tier classification
//! - `graph`: index-based adjacency with BFS and articulation-point search
//!
//! A [`Topology`] is a plain serializable snapshot. It is produced for any
//! input, however partial: devices that cannot be linked end up in the
//! `isolated` set instead of failing the build.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::model::{Device, DeviceKind};

mod builder;
mod graph;

pub use builder::{build, TopologyBuilder};
pub use graph::{BfsTree, Edge, Hop, TopologyGraph};

/// Position of a link in [`Topology::links`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub usize);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// One side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub device: String,
    pub interface: String,
}

/// Point-to-point adjacency between two interfaces sharing a subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub a: Endpoint,
    pub b: Endpoint,
    pub subnet: Ipv4Network,
    /// Lower of the two interface bandwidths, in bits per second.
    pub capacity_bps: u64,
    /// Tier of `a` at build time.
    pub a_tier: Tier,
    /// Tier of `b` at build time.
    pub b_tier: Tier,
}

impl Link {
    /// The tier of the endpoint closer to the core.
    pub fn tier(&self) -> Tier {
        self.a_tier.min(self.b_tier)
    }

    /// Whether `device` is one of the two endpoints.
    pub fn touches(&self, device: &str) -> bool {
        self.a.device == device || self.b.device == device
    }

    /// The endpoint opposite to `device`.
    pub fn peer_of(&self, device: &str) -> Option<&Endpoint> {
        if self.a.device == device {
            Some(&self.b)
        } else if self.b.device == device {
            Some(&self.a)
        } else {
            None
        }
    }

    /// The endpoint belonging to `device`.
    pub fn endpoint_of(&self, device: &str) -> Option<&Endpoint> {
        if self.a.device == device {
            Some(&self.a)
        } else if self.b.device == device {
            Some(&self.b)
        } else {
            None
        }
    }

    /// Tier recorded for `device`'s end of the link.
    pub fn tier_of(&self, device: &str) -> Option<Tier> {
        if self.a.device == device {
            Some(self.a_tier)
        } else if self.b.device == device {
            Some(self.b_tier)
        } else {
            None
        }
    }

    /// Whether the link joins `x` and `y`, in either order.
    pub fn connects(&self, x: &str, y: &str) -> bool {
        (self.a.device == x && self.b.device == y) || (self.a.device == y && self.b.device == x)
    }
}

/// Members of one CIDR bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub cidr: Ipv4Network,
    pub members: Vec<Endpoint>,
}

impl Subnet {
    /// Distinct device ids with an interface in this subnet.
    pub fn member_devices(&self) -> BTreeSet<&str> {
        self.members.iter().map(|m| m.device.as_str()).collect()
    }
}

/// Hierarchical position of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Core,
    Distribution,
    Access,
    Unclassified,
}

impl Tier {
    /// Tier a device of `kind` starts from before degree promotion.
    pub fn for_kind(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Router => Tier::Core,
            DeviceKind::Switch | DeviceKind::Firewall => Tier::Distribution,
            DeviceKind::Pc => Tier::Access,
        }
    }

    /// One tier closer to the core.
    pub fn promoted(self) -> Self {
        match self {
            Tier::Access => Tier::Distribution,
            Tier::Distribution | Tier::Core => Tier::Core,
            Tier::Unclassified => Tier::Unclassified,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Core => "core",
            Tier::Distribution => "distribution",
            Tier::Access => "access",
            Tier::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

/// How a subnet with more than two members is turned into links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetLinkPolicy {
    /// One link per unordered pair of members.
    #[default]
    FullMesh,
    /// One link from the highest-ranked member to each other member.
    HubAndSpoke,
}

/// Devices, inferred links, subnet index and tier assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub devices: Vec<Device>,
    pub links: Vec<Link>,
    pub subnets: Vec<Subnet>,
    pub tiers: BTreeMap<String, Tier>,
    pub isolated: BTreeSet<String>,
}

impl Topology {
    /// Device record by id.
    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Whether a device with this id was kept by the builder.
    pub fn contains(&self, id: &str) -> bool {
        self.device(id).is_some()
    }

    /// Link by id; `None` for ids from another topology.
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0)
    }

    /// Links with `device` at either end, in id order.
    pub fn incident_links<'a>(&'a self, device: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| l.touches(device))
    }

    /// Number of incident links; parallel links count separately.
    pub fn degree(&self, device: &str) -> usize {
        self.incident_links(device).count()
    }

    /// Distinct neighbour ids, lexically ordered.
    pub fn neighbors<'a>(&'a self, device: &'a str) -> BTreeSet<&'a str> {
        self.incident_links(device)
            .filter_map(|l| l.peer_of(device))
            .map(|e| e.device.as_str())
            .collect()
    }

    /// Every link joining `x` and `y`, in id order.
    pub fn links_between(&self, x: &str, y: &str) -> Vec<LinkId> {
        self.links
            .iter()
            .filter(|l| l.connects(x, y))
            .map(|l| l.id)
            .collect()
    }

    /// Whether the device ended up with no links.
    pub fn is_isolated(&self, device: &str) -> bool {
        self.isolated.contains(device)
    }

    /// Tier of `device`; unknown ids are `Unclassified`.
    pub fn tier(&self, device: &str) -> Tier {
        self.tiers
            .get(device)
            .copied()
            .unwrap_or(Tier::Unclassified)
    }

    /// Device ids in `tier`, lexically ordered.
    pub fn devices_in_tier(&self, tier: Tier) -> Vec<&str> {
        self.tiers
            .iter()
            .filter(|(_, t)| **t == tier)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Index-based adjacency view for graph searches.
    pub fn graph(&self) -> TopologyGraph {
        TopologyGraph::from_topology(self)
    }

    /// Hop-count shortest path, neighbours explored in lexical order.
    pub fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        self.graph().shortest_path(from, to)
    }

    /// Longest shortest path; `None` if the graph is disconnected.
    pub fn diameter(&self) -> Option<usize> {
        self.graph().diameter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_uses_snake_case_names() {
        let policy: SubnetLinkPolicy = serde_yaml::from_str("hub_and_spoke").unwrap();
        assert_eq!(policy, SubnetLinkPolicy::HubAndSpoke);
        assert!(serde_yaml::from_str::<SubnetLinkPolicy>("star").is_err());
    }

    fn triangle_with_spur() -> Topology {
        use crate::model::{Device, Interface};
        use std::net::Ipv4Addr;

        let iface = |name: &str, net: u8, host: u8| {
            Interface::new(name).with_address(Ipv4Addr::new(10, 0, net, host), 30)
        };
        build(&[
            Device::new("R1", DeviceKind::Router)
                .with_interface(iface("Gi0/0", 1, 1))
                .with_interface(iface("Gi0/1", 2, 1))
                .with_interface(iface("Gi0/2", 4, 1)),
            Device::new("R2", DeviceKind::Router)
                .with_interface(iface("Gi0/0", 1, 2))
                .with_interface(iface("Gi0/1", 3, 1)),
            Device::new("R3", DeviceKind::Router)
                .with_interface(iface("Gi0/0", 2, 2))
                .with_interface(iface("Gi0/1", 3, 2)),
            Device::new("PC1", DeviceKind::Pc).with_interface(iface("eth0", 4, 2)),
        ])
    }

    #[test]
    fn neighbors_are_distinct_and_sorted() {
        let topology = triangle_with_spur();
        let neighbors: Vec<&str> = topology.neighbors("R1").into_iter().collect();
        assert_eq!(neighbors, vec!["PC1", "R2", "R3"]);
        assert_eq!(topology.neighbors("PC1").into_iter().collect::<Vec<_>>(), vec!["R1"]);
        assert!(topology.neighbors("nobody").is_empty());
    }

    #[test]
    fn links_carry_endpoint_tiers() {
        let topology = triangle_with_spur();
        for link in &topology.links {
            assert_eq!(link.a_tier, topology.tier(&link.a.device));
            assert_eq!(link.b_tier, topology.tier(&link.b.device));
        }
        let spur = topology.links_between("R1", "PC1")[0];
        let spur = topology.link(spur).unwrap();
        assert_eq!(spur.tier(), Tier::Core);
        assert_eq!(spur.tier_of("PC1"), Some(Tier::Access));
    }

    #[test]
    fn promotion_stops_at_core() {
        assert_eq!(Tier::Access.promoted(), Tier::Distribution);
        assert_eq!(Tier::Distribution.promoted(), Tier::Core);
        assert_eq!(Tier::Core.promoted(), Tier::Core);
    }
}
