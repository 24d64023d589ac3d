//! ## netforge-core::analysis
//! **Read-only assessment of a built topology**
//!
//! ### Key Submodules:
//! - `utilization`: tree-based demand estimate per link
//! - `resilience`: cut vertices, degree-one devices and consistency checks
//! - `recommend`: issues turned into actionable recommendations
//!
//! The utilization figures are an estimator, not a measurement: every access
//! device is assumed to send one demand unit towards its nearest core device
//! along a breadth-first tree.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::DeviceKind;
use crate::topology::{LinkId, Topology};

mod recommend;
mod resilience;
mod utilization;

pub use utilization::estimate_utilization;

/// Tunables of the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    /// Links above this estimated utilization get a recommendation.
    pub utilization_threshold: f64,
    /// Above this, the recommendation is HIGH instead of MEDIUM.
    pub critical_utilization: f64,
    /// Traffic one access device is assumed to send to the core.
    pub demand_unit_bps: u64,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            utilization_threshold: 0.70,
            critical_utilization: 0.90,
            demand_unit_bps: 25_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    fn rank(self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ArticulationPoint,
    SinglePointOfFailure,
    DuplicateAddress,
    AdminDownLink,
    IsolatedDevice,
    UnreachableCore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub description: String,
    pub affected: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    AddSecondaryPath,
    AddRedundantLinks,
    AddBypassLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Severity,
    pub description: String,
    pub affected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkUtilization {
    pub link: LinkId,
    pub endpoints: (String, String),
    pub demand_units: u32,
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatistics {
    pub devices: usize,
    pub links: usize,
    pub subnets: usize,
    pub isolated: usize,
    pub by_kind: BTreeMap<DeviceKind, usize>,
    pub average_degree: f64,
    pub density: f64,
    pub average_utilization: f64,
    pub diameter: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub utilization: Vec<LinkUtilization>,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
    pub articulation_points: Vec<String>,
    pub statistics: NetworkStatistics,
}

impl AnalysisReport {
    pub fn utilization_of(&self, link: LinkId) -> Option<f64> {
        self.utilization
            .iter()
            .find(|u| u.link == link)
            .map(|u| u.utilization)
    }

    pub fn issues_for<'a>(&'a self, device: &'a str) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues
            .iter()
            .filter(move |i| i.affected.iter().any(|a| a == device))
    }

    /// Highest severity of any issue naming `device`.
    pub fn worst_severity(&self, device: &str) -> Option<Severity> {
        self.issues_for(device).map(|i| i.severity).min_by_key(|s| s.rank())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkAnalyzer {
    settings: AnalyzerSettings,
}

impl NetworkAnalyzer {
    pub fn new(settings: AnalyzerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn analyze(&self, topology: &Topology) -> AnalysisReport {
        let graph = topology.graph();
        let utilization = estimate_utilization(topology, &graph, self.settings.demand_unit_bps);

        let cut_vertices: Vec<String> = graph
            .articulation_points()
            .into_iter()
            .map(|v| graph.id(v).to_string())
            .collect();

        let mut issues = resilience::issues(topology, &graph, &cut_vertices);
        issues.extend(utilization::unreachable_core_issues(topology, &graph));
        sort_findings(&mut issues, |i| (i.severity, &i.affected));

        let mut recommendations =
            recommend::recommendations(topology, &utilization, &cut_vertices, &self.settings);
        sort_findings(&mut recommendations, |r| (r.priority, &r.affected));

        let statistics = statistics(topology, &utilization);

        info!(
            issues = issues.len(),
            recommendations = recommendations.len(),
            articulation_points = cut_vertices.len(),
            "Analysis complete"
        );

        AnalysisReport {
            utilization,
            issues,
            recommendations,
            articulation_points: cut_vertices,
            statistics,
        }
    }
}

/// Severity first, then number of affected devices (descending), then the
/// first affected id.
fn sort_findings<T>(items: &mut [T], key: impl Fn(&T) -> (Severity, &Vec<String>)) {
    items.sort_by(|x, y| {
        let (sx, ax) = key(x);
        let (sy, ay) = key(y);
        sx.rank()
            .cmp(&sy.rank())
            .then_with(|| ay.len().cmp(&ax.len()))
            .then_with(|| ax.first().cmp(&ay.first()))
    });
}

fn statistics(topology: &Topology, utilization: &[LinkUtilization]) -> NetworkStatistics {
    let n = topology.devices.len();
    let m = topology.links.len();
    let mut by_kind = BTreeMap::new();
    for device in &topology.devices {
        *by_kind.entry(device.kind).or_insert(0) += 1;
    }
    let average_degree = if n == 0 { 0.0 } else { 2.0 * m as f64 / n as f64 };
    let density = if n < 2 {
        0.0
    } else {
        2.0 * m as f64 / (n as f64 * (n as f64 - 1.0))
    };
    let average_utilization = if utilization.is_empty() {
        0.0
    } else {
        utilization.iter().map(|u| u.utilization).sum::<f64>() / utilization.len() as f64
    };
    NetworkStatistics {
        devices: n,
        links: m,
        subnets: topology.subnets.len(),
        isolated: topology.isolated.len(),
        by_kind,
        average_degree,
        density,
        average_utilization,
        diameter: topology.diameter(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Device, Interface};
    use crate::topology::build;
    use std::net::Ipv4Addr;

    fn p2p(net: u8, host: u8) -> Interface {
        Interface::new(format!("Gi0/{net}")).with_address(Ipv4Addr::new(10, 0, net, host), 30)
    }

    fn chain() -> Topology {
        build(&[
            Device::new("R1", DeviceKind::Router).with_interface(p2p(1, 1)),
            Device::new("R2", DeviceKind::Router)
                .with_interface(p2p(1, 2))
                .with_interface(p2p(2, 1)),
            Device::new("R3", DeviceKind::Router).with_interface(p2p(2, 2)),
        ])
    }

    #[test]
    fn chain_middle_is_high_ends_are_medium() {
        let report = NetworkAnalyzer::default().analyze(&chain());
        assert_eq!(report.articulation_points, vec!["R2".to_string()]);
        assert_eq!(report.worst_severity("R2"), Some(Severity::High));
        assert_eq!(report.worst_severity("R1"), Some(Severity::Medium));
        assert_eq!(report.worst_severity("R3"), Some(Severity::Medium));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.kind == RecommendationKind::AddBypassLink && r.affected == ["R2"]));
    }

    #[test]
    fn findings_are_sorted_by_severity_then_breadth() {
        let report = NetworkAnalyzer::default().analyze(&chain());
        let ranks: Vec<u8> = report.issues.iter().map(|i| i.severity.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
        assert_eq!(report.issues[0].kind, IssueKind::ArticulationPoint);
    }

    #[test]
    fn statistics_describe_the_chain() {
        let report = NetworkAnalyzer::default().analyze(&chain());
        let stats = &report.statistics;
        assert_eq!(stats.devices, 3);
        assert_eq!(stats.links, 2);
        assert_eq!(stats.diameter, Some(2));
        assert!((stats.average_degree - 4.0 / 3.0).abs() < 1e-9);
        assert!((stats.density - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_topology_yields_empty_report() {
        let report = NetworkAnalyzer::default().analyze(&build(&[]));
        assert!(report.issues.is_empty());
        assert!(report.recommendations.is_empty());
        assert_eq!(report.statistics.devices, 0);
        assert_eq!(report.statistics.diameter, Some(0));
    }
}
