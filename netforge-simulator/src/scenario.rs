//! Scenario definitions.
//!
//! A Day-1 run brings every device up from cold. A Day-2 run does the same
//! as a warm-up and then plays a script of timed actions against the
//! converged network.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use netforge_core::analysis::AnalysisReport;
use netforge_core::topology::{LinkId, Topology};

use crate::error::SimulationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    Start { device: String },
    FailLink { a: String, b: String },
    RestoreLink { a: String, b: String },
    FailDevice { device: String },
    RestoreDevice { device: String },
    /// Mangles the next frame from `from` to `to`.
    CorruptLink { from: String, to: String },
    /// Loads the link between `a` and `b` to `level` percent of capacity.
    Congest { a: String, b: String, level: u8 },
    ClearCongestion { a: String, b: String },
}

impl fmt::Display for ScenarioAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioAction::Start { device } => write!(f, "start {device}"),
            ScenarioAction::FailLink { a, b } => write!(f, "fail_link {a}-{b}"),
            ScenarioAction::RestoreLink { a, b } => write!(f, "restore_link {a}-{b}"),
            ScenarioAction::FailDevice { device } => write!(f, "fail_device {device}"),
            ScenarioAction::RestoreDevice { device } => write!(f, "restore_device {device}"),
            ScenarioAction::CorruptLink { from, to } => write!(f, "corrupt_link {from}->{to}"),
            ScenarioAction::Congest { a, b, level } => write!(f, "congest {a}-{b} {level}%"),
            ScenarioAction::ClearCongestion { a, b } => write!(f, "clear_congestion {a}-{b}"),
        }
    }
}

/// An action and its offset from the end of the warm-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

impl ScheduledAction {
    pub fn new(at_ms: u64, action: ScenarioAction) -> Self {
        Self { at_ms, action }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioScript {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub actions: Vec<ScheduledAction>,
}

impl ScenarioScript {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, at_ms: u64, action: ScenarioAction) -> Self {
        self.actions.push(ScheduledAction::new(at_ms, action));
        self
    }

    /// Actions in firing order; equal offsets keep script order.
    pub fn ordered(&self) -> Vec<ScheduledAction> {
        let mut actions = self.actions.clone();
        actions.sort_by_key(|a| a.at_ms);
        actions
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    Day1,
    Day2(ScenarioScript),
}

impl Scenario {
    pub fn name(&self) -> &str {
        match self {
            Scenario::Day1 => "day1",
            Scenario::Day2(script) => &script.name,
        }
    }

    /// Loads a Day-2 script from a `.yaml`, `.yml` or `.json` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SimulationError::ScenarioNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let script: ScenarioScript = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)?,
            Some("json") => serde_json::from_str(&raw)?,
            other => {
                return Err(SimulationError::UnsupportedFormat(
                    other.unwrap_or_default().to_string(),
                ))
            }
        };
        debug!(name = %script.name, actions = script.actions.len(), "Loaded scenario");
        Ok(Scenario::Day2(script))
    }

    /// Builds a Day-2 script from an analysis: every link over `threshold`
    /// or touching an articulation point is failed for `hold_ms` and then
    /// restored, one at a time. Falls back on the busiest link.
    pub fn generated_day2(
        topology: &Topology,
        report: &AnalysisReport,
        threshold: f64,
        hold_ms: u64,
    ) -> Self {
        let cut_vertices: BTreeSet<&str> =
            report.articulation_points.iter().map(String::as_str).collect();

        let mut flagged: BTreeSet<LinkId> = report
            .utilization
            .iter()
            .filter(|u| u.utilization > threshold)
            .map(|u| u.link)
            .collect();
        flagged.extend(
            topology
                .links
                .iter()
                .filter(|l| {
                    cut_vertices.contains(l.a.device.as_str())
                        || cut_vertices.contains(l.b.device.as_str())
                })
                .map(|l| l.id),
        );
        if flagged.is_empty() {
            let busiest = report
                .utilization
                .iter()
                .filter(|u| u.utilization > 0.0)
                .max_by(|x, y| {
                    x.utilization
                        .total_cmp(&y.utilization)
                        .then_with(|| y.link.cmp(&x.link))
                });
            flagged.extend(busiest.map(|u| u.link));
        }

        let mut pairs: Vec<(String, String)> = Vec::new();
        for link in flagged.iter().filter_map(|id| topology.link(*id)) {
            let pair = (link.a.device.clone(), link.b.device.clone());
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }

        let mut script = ScenarioScript::new("generated-day2");
        script.description = Some(format!(
            "Fail and restore {} analyzer-flagged link(s)",
            pairs.len()
        ));
        for (i, (a, b)) in pairs.into_iter().enumerate() {
            let at = i as u64 * 2 * hold_ms;
            script = script
                .with_action(
                    at,
                    ScenarioAction::FailLink {
                        a: a.clone(),
                        b: b.clone(),
                    },
                )
                .with_action(at + hold_ms, ScenarioAction::RestoreLink { a, b });
        }
        Scenario::Day2(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netforge_core::analysis::{AnalyzerSettings, NetworkAnalyzer};
    use netforge_core::model::{Device, DeviceKind, Interface};
    use netforge_core::topology::build;
    use std::net::Ipv4Addr;

    #[test]
    fn script_parses_from_yaml() {
        let yaml = r#"
name: core-flap
actions:
  - at_ms: 10
    action: fail_link
    a: R1
    b: R2
  - at_ms: 0
    action: start
    device: PC1
"#;
        let script: ScenarioScript = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(script.name, "core-flap");
        let ordered = script.ordered();
        assert_eq!(
            ordered[0].action,
            ScenarioAction::Start {
                device: "PC1".into()
            }
        );
        assert_eq!(ordered[1].at_ms, 10);
    }

    #[test]
    fn script_parses_from_json() {
        let json = r#"{"name":"x","actions":[{"at_ms":5,"action":"corrupt_link","from":"A","to":"B"}]}"#;
        let script: ScenarioScript = serde_json::from_str(json).unwrap();
        assert_eq!(
            script.actions[0].action,
            ScenarioAction::CorruptLink {
                from: "A".into(),
                to: "B".into()
            }
        );
    }

    #[test]
    fn congestion_actions_parse() {
        let yaml = r#"
name: busy-core
actions:
  - at_ms: 0
    action: congest
    a: R1
    b: R2
    level: 80
  - at_ms: 40
    action: clear_congestion
    a: R1
    b: R2
"#;
        let script: ScenarioScript = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            script.actions[0].action,
            ScenarioAction::Congest {
                a: "R1".into(),
                b: "R2".into(),
                level: 80
            }
        );
        assert_eq!(script.actions[0].action.to_string(), "congest R1-R2 80%");
        assert_eq!(
            script.actions[1].action.to_string(),
            "clear_congestion R1-R2"
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Scenario::load("no/such/scenario.yaml").unwrap_err();
        assert!(matches!(err, SimulationError::ScenarioNotFound(_)));
    }

    #[test]
    fn generated_script_targets_cut_vertex_links() {
        let p2p = |net: u8, host: u8| {
            Interface::new(format!("Gi0/{net}")).with_address(Ipv4Addr::new(10, 0, net, host), 30)
        };
        let topology = build(&[
            Device::new("R1", DeviceKind::Router).with_interface(p2p(1, 1)),
            Device::new("R2", DeviceKind::Router)
                .with_interface(p2p(1, 2))
                .with_interface(p2p(2, 1)),
            Device::new("R3", DeviceKind::Router).with_interface(p2p(2, 2)),
        ]);
        let report = NetworkAnalyzer::new(AnalyzerSettings::default()).analyze(&topology);
        let Scenario::Day2(script) = Scenario::generated_day2(&topology, &report, 0.7, 50) else {
            panic!("expected a day-2 script");
        };
        assert_eq!(script.actions.len(), 4);
        assert!(matches!(script.actions[0].action, ScenarioAction::FailLink { .. }));
        assert_eq!(script.actions[1].at_ms, 50);
        assert_eq!(script.actions[2].at_ms, 100);
    }

    #[test]
    fn actions_render_for_rejections() {
        let action = ScenarioAction::FailLink {
            a: "R1".into(),
            b: "R9".into(),
        };
        assert_eq!(action.to_string(), "fail_link R1-R9");
    }
}
