use tracing::debug;

use super::{Issue, IssueKind, LinkUtilization, Severity};
use crate::topology::{Tier, Topology, TopologyGraph};

fn vertices_in_tier(topology: &Topology, graph: &TopologyGraph, tier: Tier) -> Vec<usize> {
    topology
        .devices_in_tier(tier)
        .into_iter()
        .filter_map(|id| graph.index_of(id))
        .collect()
}

/// Routes one demand unit from every access device to its nearest core
/// device and reports the resulting load on each link, in link order.
pub fn estimate_utilization(
    topology: &Topology,
    graph: &TopologyGraph,
    demand_unit_bps: u64,
) -> Vec<LinkUtilization> {
    let mut units = vec![0u32; topology.links.len()];
    let cores = vertices_in_tier(topology, graph, Tier::Core);

    if !cores.is_empty() {
        let tree = graph.bfs(&cores);
        for access in vertices_in_tier(topology, graph, Tier::Access) {
            if tree.dist[access].is_none() {
                continue;
            }
            for link in tree.links_to_source(access) {
                units[link.0] += 1;
            }
        }
    } else {
        debug!("No core-tier device, utilization estimate is empty");
    }

    topology
        .links
        .iter()
        .map(|link| {
            let load = u64::from(units[link.id.0]).saturating_mul(demand_unit_bps);
            let utilization = if link.capacity_bps == 0 {
                0.0
            } else {
                (load as f64 / link.capacity_bps as f64).clamp(0.0, 1.0)
            };
            LinkUtilization {
                link: link.id,
                endpoints: (link.a.device.clone(), link.b.device.clone()),
                demand_units: units[link.id.0],
                utilization,
            }
        })
        .collect()
}

/// Access devices with links but no path to any core device.
pub(super) fn unreachable_core_issues(topology: &Topology, graph: &TopologyGraph) -> Vec<Issue> {
    let cores = vertices_in_tier(topology, graph, Tier::Core);
    if cores.is_empty() {
        return Vec::new();
    }
    let tree = graph.bfs(&cores);
    vertices_in_tier(topology, graph, Tier::Access)
        .into_iter()
        .filter(|&v| tree.dist[v].is_none())
        .map(|v| Issue {
            kind: IssueKind::UnreachableCore,
            severity: Severity::Medium,
            description: format!("{} has no path to any core device", graph.id(v)),
            affected: vec![graph.id(v).to_string()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Device, DeviceKind, Interface, HUNDRED_MBPS};
    use crate::topology::build;
    use std::net::Ipv4Addr;

    fn iface(name: &str, net: u8, host: u8) -> Interface {
        Interface::new(name).with_address(Ipv4Addr::new(10, 1, net, host), 24)
    }

    /// R1 - S1 uplink on net 1, four PCs hanging off S1 on /24s of their own.
    fn star(pcs: u8) -> Topology {
        let mut devices = vec![
            Device::new("R1", DeviceKind::Router).with_interface(iface("Fa0/0", 1, 1)),
        ];
        let mut switch = Device::new("S1", DeviceKind::Switch).with_interface(iface("Fa0/0", 1, 2));
        for n in 0..pcs {
            let net = 10 + n;
            switch = switch.with_interface(iface(&format!("Fa0/{}", n + 1), net, 1));
            devices.push(
                Device::new(format!("PC{n}"), DeviceKind::Pc).with_interface(iface("eth0", net, 2)),
            );
        }
        devices.push(switch);
        build(&devices)
    }

    #[test]
    fn uplink_carries_every_access_unit() {
        let topology = star(4);
        let graph = topology.graph();
        let estimate = estimate_utilization(&topology, &graph, 25_000_000);
        let uplink = topology.links_between("R1", "S1")[0];
        let entry = &estimate[uplink.0];
        assert_eq!(topology.links[uplink.0].capacity_bps, HUNDRED_MBPS);
        assert_eq!(entry.demand_units, 4);
        assert!((entry.utilization - 1.0).abs() < 1e-9);
    }

    #[test]
    fn utilization_is_clamped() {
        let topology = star(6);
        let graph = topology.graph();
        let estimate = estimate_utilization(&topology, &graph, 25_000_000);
        assert!(estimate.iter().all(|u| (0.0..=1.0).contains(&u.utilization)));
    }

    #[test]
    fn access_without_core_path_is_reported() {
        let topology = build(&[
            Device::new("R1", DeviceKind::Router).with_interface(iface("Gi0/0", 1, 1)),
            Device::new("R2", DeviceKind::Router).with_interface(iface("Gi0/0", 1, 2)),
            Device::new("PC1", DeviceKind::Pc).with_interface(iface("eth0", 2, 1)),
            Device::new("PC2", DeviceKind::Pc).with_interface(iface("eth0", 2, 2)),
        ]);
        let graph = topology.graph();
        let issues = unreachable_core_issues(&topology, &graph);
        let affected: Vec<&str> = issues.iter().map(|i| i.affected[0].as_str()).collect();
        assert_eq!(affected, vec!["PC1", "PC2"]);
    }
}
