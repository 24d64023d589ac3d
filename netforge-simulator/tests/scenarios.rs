use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

use netforge_config::SimulatorConfig;
use netforge_core::analysis::{AnalyzerSettings, NetworkAnalyzer};
use netforge_core::model::{Device, DeviceKind, Interface};
use netforge_core::topology::{build, Topology};
use netforge_simulator::{
    run, Completion, EventKind, FailureCause, NodeState, Scenario, ScenarioAction, ScenarioScript,
    SimulationEngine,
};

fn p2p(net: u8, host: u8) -> Interface {
    Interface::new(format!("Gi0/{net}")).with_address(Ipv4Addr::new(10, 0, net, host), 30)
}

/// R1 - R2 - R3, with a switch and two PCs hanging off R3.
fn branch() -> Topology {
    let lan = |host: u8| Interface::new("eth0").with_address(Ipv4Addr::new(192, 168, 1, host), 24);
    build(&[
        Device::new("R1", DeviceKind::Router).with_interface(p2p(1, 1)),
        Device::new("R2", DeviceKind::Router)
            .with_interface(p2p(1, 2))
            .with_interface(p2p(2, 1)),
        Device::new("R3", DeviceKind::Router)
            .with_interface(p2p(2, 2))
            .with_interface(p2p(3, 1)),
        Device::new("SW1", DeviceKind::Switch)
            .with_interface(p2p(3, 2))
            .with_interface(lan(1)),
        Device::new("PC1", DeviceKind::Pc).with_interface(lan(10)),
        Device::new("PC2", DeviceKind::Pc).with_interface(lan(11)),
    ])
}

fn lossy() -> SimulatorConfig {
    let mut config = SimulatorConfig::default().with_seed(7);
    config.network.latency_ms = 2;
    config.network.jitter_ms = 3;
    config.network.loss_probability = 0.05;
    config
}

#[test]
fn day1_brings_every_device_up() {
    let topology = branch();
    let result = run(&topology, &Scenario::Day1, SimulatorConfig::default()).unwrap();

    assert_eq!(result.completion, Completion::Complete);
    assert_eq!(result.final_states.len(), topology.devices.len());
    assert_eq!(
        result.states_in(NodeState::Operational).len(),
        topology.devices.len()
    );
    assert_eq!(result.events_of(EventKind::Converged).count(), topology.devices.len());
    assert!(result.actor_faults.is_empty());
    assert!(result.logical_duration_ms > 0);
    assert_eq!(result.fingerprint.len(), 64);
}

#[test]
fn events_are_totally_ordered() {
    let result = run(&branch(), &Scenario::Day1, lossy()).unwrap();
    for (i, event) in result.events.iter().enumerate() {
        assert_eq!(event.seq, i as u64);
    }
    assert!(result.events.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
}

#[test]
fn same_seed_same_run() {
    let topology = branch();
    let first = run(&topology, &Scenario::Day1, lossy()).unwrap();
    let second = run(&topology, &Scenario::Day1, lossy()).unwrap();
    assert_eq!(first.events, second.events);
    assert_eq!(first.fingerprint, second.fingerprint);
}

#[test]
fn pause_and_resume_do_not_change_the_outcome() {
    let topology = branch();
    let script = ScenarioScript::new("flap")
        .with_action(
            0,
            ScenarioAction::FailLink {
                a: "R2".into(),
                b: "R3".into(),
            },
        )
        .with_action(
            80,
            ScenarioAction::RestoreLink {
                a: "R2".into(),
                b: "R3".into(),
            },
        );
    let scenario = Scenario::Day2(script);

    let reference = run(&topology, &scenario, lossy()).unwrap();

    let engine = SimulationEngine::new(&topology, lossy());
    let controller = engine.controller();
    let handle = {
        let scenario = scenario.clone();
        thread::spawn(move || engine.run(&scenario))
    };
    for _ in 0..10 {
        if controller.pause() {
            assert!(controller.is_paused());
            thread::sleep(Duration::from_millis(5));
            controller.resume();
        }
        thread::sleep(Duration::from_millis(1));
    }
    let interrupted = handle.join().unwrap().unwrap();

    assert_eq!(interrupted.completion, Completion::Complete);
    assert_eq!(interrupted.events, reference.events);
    assert_eq!(interrupted.final_states, reference.final_states);
    assert_eq!(interrupted.fingerprint, reference.fingerprint);
}

#[test]
fn losing_the_sole_link_fails_only_the_leaf() {
    let script = ScenarioScript::new("cut-r1").with_action(
        0,
        ScenarioAction::FailLink {
            a: "R1".into(),
            b: "R2".into(),
        },
    );
    let result = run(&branch(), &Scenario::Day2(script), SimulatorConfig::default()).unwrap();

    assert!(result.is_complete());
    assert_eq!(result.failed_devices(), vec!["R1"]);
    let failure = result
        .events_of(EventKind::Failed)
        .find(|e| e.device.as_deref() == Some("R1"))
        .unwrap();
    assert_eq!(failure.failure_cause(), Some(FailureCause::LastLinkLost));
    assert_eq!(result.events_of(EventKind::Failed).count(), 1);
    assert_eq!(result.events_of(EventKind::LinkDown).count(), 1);
    assert!(result.events_of(EventKind::RouteWithdrawn).count() > 0);
    assert!(result.actor_faults.is_empty());
}

#[test]
fn restoring_the_link_brings_the_leaf_back() {
    let script = ScenarioScript::new("flap-r1")
        .with_action(
            0,
            ScenarioAction::FailLink {
                a: "R1".into(),
                b: "R2".into(),
            },
        )
        .with_action(
            50,
            ScenarioAction::RestoreLink {
                a: "R1".into(),
                b: "R2".into(),
            },
        );
    let result = run(&branch(), &Scenario::Day2(script), SimulatorConfig::default()).unwrap();

    assert!(result.is_complete());
    assert!(result.failed_devices().is_empty());
    assert_eq!(result.events_of(EventKind::Restored).count(), 1);
}

#[test]
fn corruption_isolates_the_receiver() {
    let script = ScenarioScript::new("corrupt").with_action(
        0,
        ScenarioAction::CorruptLink {
            from: "R1".into(),
            to: "R2".into(),
        },
    );
    let result = run(&branch(), &Scenario::Day2(script), SimulatorConfig::default()).unwrap();

    assert!(result.is_complete());
    assert_eq!(result.failed_devices(), vec!["R2"]);
    assert_eq!(result.actor_faults.len(), 1);
    assert_eq!(result.actor_faults[0].device, "R2");
    assert_eq!(result.actor_faults[0].cause, FailureCause::Malformed);
    assert_eq!(result.events_of(EventKind::CorruptionInjected).count(), 1);
    assert_eq!(result.final_states["R1"], NodeState::Operational);
    assert_eq!(result.final_states["R3"], NodeState::Operational);
}

#[test]
fn failed_device_can_be_restored() {
    let script = ScenarioScript::new("reboot-sw1")
        .with_action(
            0,
            ScenarioAction::FailDevice {
                device: "SW1".into(),
            },
        )
        .with_action(
            40,
            ScenarioAction::RestoreDevice {
                device: "SW1".into(),
            },
        );
    let result = run(&branch(), &Scenario::Day2(script), SimulatorConfig::default()).unwrap();

    assert!(result.is_complete());
    assert!(result.failed_devices().is_empty());
    let failure = result
        .events_of(EventKind::Failed)
        .find(|e| e.device.as_deref() == Some("SW1"))
        .unwrap();
    assert_eq!(failure.failure_cause(), Some(FailureCause::InjectedFault));
    // Neighbours of a failed device keep running.
    assert_eq!(result.events_of(EventKind::Failed).count(), 1);
}

#[test]
fn restored_device_without_live_links_fails_again() {
    let fail_r1 = ScenarioScript::new("restore-cut-r1")
        .with_action(
            0,
            ScenarioAction::FailDevice {
                device: "R1".into(),
            },
        )
        .with_action(
            10,
            ScenarioAction::FailLink {
                a: "R1".into(),
                b: "R2".into(),
            },
        )
        .with_action(
            20,
            ScenarioAction::RestoreDevice {
                device: "R1".into(),
            },
        );
    let result = run(&branch(), &Scenario::Day2(fail_r1.clone()), SimulatorConfig::default()).unwrap();

    assert!(result.is_complete());
    assert_eq!(result.failed_devices(), vec!["R1"]);
    let causes: Vec<_> = result
        .events_of(EventKind::Failed)
        .filter(|e| e.device.as_deref() == Some("R1"))
        .map(|e| e.failure_cause())
        .collect();
    assert_eq!(
        causes,
        vec![
            Some(FailureCause::InjectedFault),
            Some(FailureCause::LastLinkLost)
        ]
    );
    assert_eq!(
        result
            .events_of(EventKind::Converged)
            .filter(|e| e.device.as_deref() == Some("R1"))
            .count(),
        1
    );

    let relink = fail_r1.with_action(
        60,
        ScenarioAction::RestoreLink {
            a: "R1".into(),
            b: "R2".into(),
        },
    );
    let result = run(&branch(), &Scenario::Day2(relink), SimulatorConfig::default()).unwrap();
    assert!(result.is_complete());
    assert!(result.failed_devices().is_empty());
    assert_eq!(result.final_states["R1"], NodeState::Operational);
}

#[test]
fn short_timeout_returns_partial_result() {
    let config = SimulatorConfig::default().with_timeout_ms(3);
    let result = run(&branch(), &Scenario::Day1, config).unwrap();

    assert_eq!(result.completion, Completion::TimedOut);
    assert_eq!(result.logical_duration_ms, 3);
    assert_eq!(result.statistics.rounds, 3);
    assert_eq!(result.states_in(NodeState::Starting).len(), 6);
}

#[test]
fn generated_day2_fails_and_restores_flagged_links() {
    let topology = branch();
    let settings = AnalyzerSettings::default();
    let report = NetworkAnalyzer::new(settings.clone()).analyze(&topology);
    let scenario =
        Scenario::generated_day2(&topology, &report, settings.utilization_threshold, 100);

    let result = run(&topology, &scenario, SimulatorConfig::default()).unwrap();

    assert!(result.is_complete());
    let downs = result.events_of(EventKind::LinkDown).count();
    assert!(downs > 0);
    assert_eq!(downs, result.events_of(EventKind::LinkUp).count());
    assert_eq!(result.events_of(EventKind::ActionRejected).count(), 0);
    assert!(result.failed_devices().is_empty());
}

#[test]
fn stop_ends_the_run() {
    let script = ScenarioScript::new("far-future").with_action(
        5_000_000,
        ScenarioAction::FailDevice {
            device: "R1".into(),
        },
    );
    let config = SimulatorConfig::default().with_timeout_ms(10_000_000);
    let engine = SimulationEngine::new(&branch(), config);
    let controller = engine.controller();
    let handle = thread::spawn(move || engine.run(&Scenario::Day2(script)));

    thread::sleep(Duration::from_millis(50));
    controller.stop();
    let result = handle.join().unwrap().unwrap();

    assert_eq!(result.completion, Completion::Stopped);
    assert_eq!(result.statistics.nodes.len(), 6);
}

#[test]
fn random_chaos_faults_are_reported() {
    let mut config = SimulatorConfig::default().with_timeout_ms(300);
    config.chaos.fault_probability = 1.0;
    let result = run(&branch(), &Scenario::Day1, config).unwrap();

    assert!(result.events_of(EventKind::CorruptionInjected).count() > 0);
    assert!(!result.actor_faults.is_empty());
    assert!(result
        .actor_faults
        .iter()
        .all(|f| f.cause == FailureCause::Malformed));
}
