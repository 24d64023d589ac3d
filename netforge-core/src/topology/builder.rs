use std::collections::{BTreeMap, BTreeSet, HashMap};

use ipnetwork::Ipv4Network;
use tracing::{debug, info, warn};

use super::{Endpoint, Link, LinkId, Subnet, SubnetLinkPolicy, Tier, Topology};
use crate::model::{Device, DeviceKind};

/// Builds a topology with the default full-mesh policy.
pub fn build(devices: &[Device]) -> Topology {
    TopologyBuilder::default().build(devices)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TopologyBuilder {
    policy: SubnetLinkPolicy,
}

/// A (device, interface) pair placed in a subnet bucket.
#[derive(Debug, Clone, Copy)]
struct Member {
    device: usize,
    interface: usize,
}

impl TopologyBuilder {
    pub fn new(policy: SubnetLinkPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SubnetLinkPolicy {
        self.policy
    }

    pub fn build(&self, devices: &[Device]) -> Topology {
        let devices = dedup_devices(devices);
        let buckets = index_subnets(&devices);

        let mut links = Vec::new();
        let mut subnets = Vec::with_capacity(buckets.len());
        for (cidr, members) in buckets.values() {
            for (x, y) in self.pairs(&devices, members) {
                let (mx, my) = (members[x], members[y]);
                if mx.device == my.device {
                    continue;
                }
                links.push(make_link(LinkId(links.len()), *cidr, &devices, mx, my));
            }
            subnets.push(Subnet {
                cidr: *cidr,
                members: members.iter().map(|m| endpoint(&devices, *m)).collect(),
            });
        }

        let mut degree: HashMap<&str, usize> = HashMap::new();
        for link in &links {
            *degree.entry(link.a.device.as_str()).or_default() += 1;
            *degree.entry(link.b.device.as_str()).or_default() += 1;
        }
        let isolated: BTreeSet<String> = devices
            .iter()
            .filter(|d| !degree.contains_key(d.id.as_str()))
            .map(|d| d.id.clone())
            .collect();
        let tiers = classify_tiers(&devices, &degree);
        for link in &mut links {
            link.a_tier = tiers.get(&link.a.device).copied().unwrap_or(Tier::Unclassified);
            link.b_tier = tiers.get(&link.b.device).copied().unwrap_or(Tier::Unclassified);
        }

        info!(
            devices = devices.len(),
            links = links.len(),
            subnets = subnets.len(),
            isolated = isolated.len(),
            policy = ?self.policy,
            "Built topology"
        );

        Topology {
            devices,
            links,
            subnets,
            tiers,
            isolated,
        }
    }

    /// Member index pairs to connect inside one subnet.
    fn pairs(&self, devices: &[Device], members: &[Member]) -> Vec<(usize, usize)> {
        if members.len() < 2 {
            return Vec::new();
        }
        match self.policy {
            SubnetLinkPolicy::FullMesh => (0..members.len())
                .flat_map(|x| (x + 1..members.len()).map(move |y| (x, y)))
                .collect(),
            SubnetLinkPolicy::HubAndSpoke => {
                let hub = (0..members.len())
                    .min_by(|&x, &y| {
                        let (dx, dy) = (&devices[members[x].device], &devices[members[y].device]);
                        dy.kind
                            .hub_rank()
                            .cmp(&dx.kind.hub_rank())
                            .then_with(|| dx.id.cmp(&dy.id))
                    })
                    .unwrap_or(0);
                (0..members.len())
                    .filter(|&m| m != hub)
                    .map(|m| (hub.min(m), hub.max(m)))
                    .collect()
            }
        }
    }
}

fn dedup_devices(devices: &[Device]) -> Vec<Device> {
    let mut seen = BTreeSet::new();
    let mut kept = Vec::with_capacity(devices.len());
    for device in devices {
        if seen.insert(device.id.as_str()) {
            kept.push(device.clone());
        } else {
            warn!(device = %device.id, "Duplicate device id, keeping first record");
        }
    }
    kept
}

fn index_subnets(devices: &[Device]) -> BTreeMap<(u32, u8), (Ipv4Network, Vec<Member>)> {
    let mut buckets: BTreeMap<(u32, u8), (Ipv4Network, Vec<Member>)> = BTreeMap::new();
    for (d, device) in devices.iter().enumerate() {
        for (i, iface) in device.interfaces.iter().enumerate() {
            let Some(cidr) = iface.network() else {
                if iface.ip.is_some() {
                    debug!(device = %device.id, interface = %iface.name, "Interface has an address but no usable mask");
                }
                continue;
            };
            buckets
                .entry((u32::from(cidr.network()), cidr.prefix()))
                .or_insert_with(|| (cidr, Vec::new()))
                .1
                .push(Member {
                    device: d,
                    interface: i,
                });
        }
    }
    buckets
}

fn endpoint(devices: &[Device], member: Member) -> Endpoint {
    let device = &devices[member.device];
    Endpoint {
        device: device.id.clone(),
        interface: device.interfaces[member.interface].name.clone(),
    }
}

fn make_link(id: LinkId, subnet: Ipv4Network, devices: &[Device], x: Member, y: Member) -> Link {
    let bandwidth = |m: Member| {
        let device = &devices[m.device];
        device.interfaces[m.interface].effective_bandwidth(device.kind)
    };
    Link {
        id,
        a: endpoint(devices, x),
        b: endpoint(devices, y),
        subnet,
        capacity_bps: bandwidth(x).min(bandwidth(y)),
        a_tier: Tier::Unclassified,
        b_tier: Tier::Unclassified,
    }
}

fn classify_tiers(devices: &[Device], degree: &HashMap<&str, usize>) -> BTreeMap<String, Tier> {
    let mut tiers = BTreeMap::new();
    let mut groups: BTreeMap<DeviceKind, Vec<(&str, usize)>> = BTreeMap::new();

    for device in devices {
        match degree.get(device.id.as_str()) {
            Some(&d) => {
                tiers.insert(device.id.clone(), Tier::for_kind(device.kind));
                groups
                    .entry(device.kind)
                    .or_default()
                    .push((device.id.as_str(), d));
            }
            None => {
                tiers.insert(device.id.clone(), Tier::Unclassified);
            }
        }
    }

    for members in groups.values() {
        if members.len() < 2 {
            continue;
        }
        let Some(max) = members.iter().map(|(_, d)| *d).max() else {
            continue;
        };
        let mut leaders = members.iter().filter(|(_, d)| *d == max);
        if let (Some((id, _)), None) = (leaders.next(), leaders.next()) {
            if let Some(tier) = tiers.get_mut(*id) {
                *tier = tier.promoted();
            }
        }
    }
    tiers
}
