use std::collections::BTreeMap;

use super::{AnalyzerSettings, LinkUtilization, Recommendation, RecommendationKind, Severity};
use crate::topology::{Tier, Topology};

pub(super) fn recommendations(
    topology: &Topology,
    utilization: &[LinkUtilization],
    cut_vertices: &[String],
    settings: &AnalyzerSettings,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    for entry in utilization
        .iter()
        .filter(|u| u.utilization > settings.utilization_threshold)
    {
        let priority = if entry.utilization > settings.critical_utilization {
            Severity::High
        } else {
            Severity::Medium
        };
        let (a, b) = &entry.endpoints;
        out.push(Recommendation {
            kind: RecommendationKind::AddSecondaryPath,
            priority,
            description: format!(
                "Link {} between {a} and {b} is at {:.0}% estimated utilization; add a parallel or alternate path",
                entry.link,
                entry.utilization * 100.0
            ),
            affected: vec![a.clone(), b.clone()],
        });
    }

    let mut max_degree: BTreeMap<Tier, (usize, Vec<String>)> = BTreeMap::new();
    for (id, tier) in &topology.tiers {
        if *tier == Tier::Unclassified {
            continue;
        }
        let entry = max_degree.entry(*tier).or_insert((0, Vec::new()));
        entry.0 = entry.0.max(topology.degree(id));
        entry.1.push(id.clone());
    }
    for (tier, (degree, members)) in max_degree {
        if degree == 1 {
            out.push(Recommendation {
                kind: RecommendationKind::AddRedundantLinks,
                priority: Severity::Medium,
                description: format!("Every {tier} device has a single link; add redundant uplinks"),
                affected: members,
            });
        }
    }

    for id in cut_vertices {
        out.push(Recommendation {
            kind: RecommendationKind::AddBypassLink,
            priority: Severity::High,
            description: format!("Add a link that bypasses {id} so its failure does not split the network"),
            affected: vec![id.clone()],
        });
    }

    out
}
