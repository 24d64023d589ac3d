#[macro_use]
extern crate criterion;

use std::net::Ipv4Addr;

use criterion::Criterion;

use netforge_core::prelude::*;

/// Core ring of routers, each with a switch and a handful of PCs below it.
fn campus(sites: u8, pcs_per_site: u8) -> Vec<Device> {
    let mut devices = Vec::new();
    for s in 0..sites {
        let next = (s + 1) % sites;
        devices.push(
            Device::new(format!("R{s}"), DeviceKind::Router)
                .with_interface(Interface::new("Te0/0").with_address(Ipv4Addr::new(10, 0, s, 1), 30))
                .with_interface(Interface::new("Te0/1").with_address(Ipv4Addr::new(10, 0, next, 2), 30))
                .with_interface(Interface::new("Gi0/0").with_address(Ipv4Addr::new(10, 1, s, 1), 30)),
        );
        let switch = Device::new(format!("S{s}"), DeviceKind::Switch)
            .with_interface(Interface::new("Gi0/0").with_address(Ipv4Addr::new(10, 1, s, 2), 30))
            .with_interface(Interface::new("Fa0/0").with_address(Ipv4Addr::new(10, 2, s, 1), 24));
        devices.push(switch);
        for p in 0..pcs_per_site {
            devices.push(
                Device::new(format!("PC{s}-{p}"), DeviceKind::Pc)
                    .with_interface(Interface::new("eth0").with_address(Ipv4Addr::new(10, 2, s, 10 + p), 24)),
            );
        }
    }
    devices
}

fn bench_build_and_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology");

    for sites in [4u8, 16, 64] {
        let devices = campus(sites, 4);
        group.throughput(criterion::Throughput::Elements(devices.len() as u64));
        group.bench_function(format!("build_{}_sites", sites), |b| {
            b.iter(|| build(&devices));
        });
        let topology = build(&devices);
        let analyzer = NetworkAnalyzer::default();
        group.bench_function(format!("analyze_{}_sites", sites), |b| {
            b.iter(|| analyzer.analyze(&topology));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_and_analyze);
criterion_main!(benches);
