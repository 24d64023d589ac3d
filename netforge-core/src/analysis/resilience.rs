use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use super::{Issue, IssueKind, Severity};
use crate::topology::{Endpoint, Topology, TopologyGraph};

pub(super) fn issues(topology: &Topology, graph: &TopologyGraph, cut_vertices: &[String]) -> Vec<Issue> {
    let mut issues: Vec<Issue> = cut_vertices
        .iter()
        .map(|id| Issue {
            kind: IssueKind::ArticulationPoint,
            severity: Severity::High,
            description: format!("Failure of {id} partitions the network"),
            affected: vec![id.clone()],
        })
        .collect();

    for v in (0..graph.len()).filter(|&v| graph.degree(v) == 1) {
        let id = graph.id(v);
        issues.push(Issue {
            kind: IssueKind::SinglePointOfFailure,
            severity: Severity::Medium,
            description: format!("{id} is attached by a single link"),
            affected: vec![id.to_string()],
        });
    }

    issues.extend(duplicate_addresses(topology));
    issues.extend(admin_down_links(topology));

    for id in &topology.isolated {
        issues.push(Issue {
            kind: IssueKind::IsolatedDevice,
            severity: Severity::Low,
            description: format!("{id} shares no subnet with any other device"),
            affected: vec![id.clone()],
        });
    }
    issues
}

fn address_of(topology: &Topology, endpoint: &Endpoint) -> Option<Ipv4Addr> {
    topology
        .device(&endpoint.device)?
        .interface(&endpoint.interface)?
        .ip
}

fn duplicate_addresses(topology: &Topology) -> Vec<Issue> {
    let mut issues = Vec::new();
    for subnet in &topology.subnets {
        let mut owners: BTreeMap<Ipv4Addr, BTreeSet<&str>> = BTreeMap::new();
        let mut claims: BTreeMap<Ipv4Addr, usize> = BTreeMap::new();
        for member in &subnet.members {
            if let Some(ip) = address_of(topology, member) {
                owners.entry(ip).or_default().insert(member.device.as_str());
                *claims.entry(ip).or_default() += 1;
            }
        }
        for (ip, devices) in owners {
            if claims.get(&ip).copied().unwrap_or(0) < 2 {
                continue;
            }
            issues.push(Issue {
                kind: IssueKind::DuplicateAddress,
                severity: Severity::High,
                description: format!("{ip} is configured more than once in {}", subnet.cidr),
                affected: devices.into_iter().map(str::to_string).collect(),
            });
        }
    }
    issues
}

fn admin_down_links(topology: &Topology) -> Vec<Issue> {
    let is_down = |endpoint: &Endpoint| {
        topology
            .device(&endpoint.device)
            .and_then(|d| d.interface(&endpoint.interface))
            .is_some_and(|i| !i.admin_up)
    };
    topology
        .links
        .iter()
        .filter(|l| is_down(&l.a) || is_down(&l.b))
        .map(|l| Issue {
            kind: IssueKind::AdminDownLink,
            severity: Severity::Low,
            description: format!(
                "Link {} between {} and {} has an administratively down end",
                l.id, l.a.device, l.b.device
            ),
            affected: vec![l.a.device.clone(), l.b.device.clone()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Device, DeviceKind, Interface};
    use crate::topology::build;

    fn iface(host: u8) -> Interface {
        Interface::new("Gi0/0").with_address(Ipv4Addr::new(192, 168, 0, host), 24)
    }

    #[test]
    fn duplicate_address_is_high() {
        let topology = build(&[
            Device::new("A", DeviceKind::Router).with_interface(iface(1)),
            Device::new("B", DeviceKind::Router).with_interface(iface(1)),
            Device::new("C", DeviceKind::Router).with_interface(iface(3)),
        ]);
        let graph = topology.graph();
        let found = issues(&topology, &graph, &[]);
        let dup = found
            .iter()
            .find(|i| i.kind == IssueKind::DuplicateAddress)
            .unwrap();
        assert_eq!(dup.severity, Severity::High);
        assert_eq!(dup.affected, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn admin_down_and_isolated_are_low() {
        let topology = build(&[
            Device::new("A", DeviceKind::Switch).with_interface(iface(1).with_admin_up(false)),
            Device::new("B", DeviceKind::Switch).with_interface(iface(2)),
            Device::new("C", DeviceKind::Pc),
        ]);
        let graph = topology.graph();
        let found = issues(&topology, &graph, &[]);
        let low: Vec<IssueKind> = found
            .iter()
            .filter(|i| i.severity == Severity::Low)
            .map(|i| i.kind)
            .collect();
        assert!(low.contains(&IssueKind::AdminDownLink));
        assert!(low.contains(&IssueKind::IsolatedDevice));
    }
}
