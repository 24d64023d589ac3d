#[macro_use]
extern crate criterion;

use std::net::Ipv4Addr;

use criterion::{black_box, Criterion};

use netforge_config::SimulatorConfig;
use netforge_core::model::{Device, DeviceKind, Interface};
use netforge_core::topology::{build, Topology};
use netforge_simulator::{run, Scenario};

/// A ring of `n` routers joined by point-to-point links.
fn ring(n: u8) -> Topology {
    let devices: Vec<Device> = (0..n)
        .map(|i| {
            let prev = (i + n - 1) % n;
            Device::new(format!("R{i}"), DeviceKind::Router)
                .with_interface(Interface::new("Gi0/0").with_address(Ipv4Addr::new(10, 0, i, 1), 30))
                .with_interface(Interface::new("Gi0/1").with_address(Ipv4Addr::new(10, 0, prev, 2), 30))
        })
        .collect();
    build(&devices)
}

/// Wall time of a complete Day-1 bring-up.
fn benchmark_day1(c: &mut Criterion) {
    let mut group = c.benchmark_group("day1");
    group.sample_size(10);
    for n in [4u8, 16] {
        let topology = ring(n);
        group.bench_function(format!("ring_{n}"), |b| {
            b.iter(|| {
                let result = run(&topology, &Scenario::Day1, SimulatorConfig::default());
                black_box(result.map(|r| r.fingerprint))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_day1);
criterion_main!(benches);
