use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use tamon::truth::{Substitutions, Tolerance};
use tamon::{Degree, Monitor, MonitorOptions, Snapshot, Table, Truth};

const NONDET_ECS: &str = include_str!("../demos/nondet_ecs.ta");

fn monitor<T: Truth>(table: &Arc<Table>, deduplicate: bool, substitutions: Substitutions) -> Monitor<T> {
    let options = MonitorOptions {
        deduplicate,
        ..MonitorOptions::default()
    };
    Monitor::new(table.clone(), options, substitutions)
}

// water level oscillates around the target, the gate follows every other step
fn run<T: Truth>(mut monitor: Monitor<T>, steps: usize) -> usize {
    for i in 0..steps {
        monitor.advance(100, 2);
        let wl = if i % 2 == 0 { 40 } else { 60 };
        let snapshot = Snapshot::new()
            .with("wl", wl)
            .with("tl", 50)
            .with("gate_closed", ((i / 2) % 2) as i64)
            .with("duration", i64::MAX);
        if monitor.step(snapshot).is_err() {
            break;
        }
    }
    monitor.tokens().len()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let table = Arc::new(Table::parse(NONDET_ECS).expect("demo automaton parses"));

    c.bench_function("boolean 100 steps", |b| {
        b.iter(|| run(monitor::<bool>(&table, true, Substitutions::new()), black_box(100)))
    });
    c.bench_function("boolean 1k steps", |b| {
        b.iter(|| run(monitor::<bool>(&table, true, Substitutions::new()), black_box(1_000)))
    });
    c.bench_function("boolean 20 steps without deduplication", |b| {
        b.iter(|| run(monitor::<bool>(&table, false, Substitutions::new()), black_box(20)))
    });

    let timer = table.clock_id("timer").expect("timer is declared");
    c.bench_function("quantitative 100 steps", |b| {
        b.iter(|| {
            let mut substitutions = Substitutions::new();
            substitutions.register(timer, Arc::new(Tolerance::new(50)));
            run(monitor::<Degree>(&table, true, substitutions), black_box(100))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
