//! Simulator throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spansim_lib::core::{OperationKind, OperationRequest, ServiceName};
use spansim_lib::simulator::{OperationSimulator, PolicyTable, Randomness};

fn bench_simulate(c: &mut Criterion) {
    let simulator = OperationSimulator::new(
        ServiceName::new("bench".to_string()).unwrap(),
        PolicyTable::new(),
        Randomness::seeded(1),
    );

    let mut group = c.benchmark_group("simulate");
    for kind in [
        OperationKind::Service,
        OperationKind::Distributed,
        OperationKind::TradeBuy,
        OperationKind::SloLatency,
    ] {
        let request = OperationRequest::new(kind);
        group.bench_with_input(BenchmarkId::from_parameter(kind), &request, |b, request| {
            b.iter(|| black_box(simulator.simulate(request).unwrap()));
        });
    }
    group.finish();
}

fn bench_simulate_with_record(c: &mut Criterion) {
    let simulator = OperationSimulator::new(
        ServiceName::new("bench".to_string()).unwrap(),
        PolicyTable::new(),
        Randomness::seeded(2),
    );
    let request = OperationRequest::new(OperationKind::Distributed);

    c.bench_function("simulate_and_build_record", |b| {
        b.iter(|| black_box(simulator.run(&request).unwrap()));
    });
}

criterion_group!(benches, bench_simulate, bench_simulate_with_record);
criterion_main!(benches);
