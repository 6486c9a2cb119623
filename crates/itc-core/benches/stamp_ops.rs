use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use itc_core::Stamp;

/// Fork `replicas` stamps off a seed and give each one `events` events,
/// interleaving a gossip join every few steps so the event tree branches.
fn build_system(replicas: usize, events: usize) -> Vec<Stamp> {
    let mut stamps = vec![Stamp::seed()];
    while stamps.len() < replicas {
        let idx = stamps.len() / 2;
        let forked = stamps[idx].fork().expect("seed descendants fork");
        stamps.push(forked);
    }
    for round in 0..events {
        for idx in 0..stamps.len() {
            stamps[idx].event().expect("event");
            if round % 3 == 0 {
                let neighbour = stamps[(idx + 1) % stamps.len()].peek();
                stamps[idx].join(neighbour);
            }
        }
    }
    stamps
}

fn bench_event(c: &mut Criterion) {
    let mut group = c.benchmark_group("stamp.event");
    for replicas in [2, 8, 32] {
        let system = build_system(replicas, 8);
        group.bench_with_input(
            BenchmarkId::from_parameter(replicas),
            &system,
            |b, system| {
                b.iter(|| {
                    let mut stamp = system[0].clone();
                    stamp.event().expect("event");
                    black_box(stamp)
                });
            },
        );
    }
    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("stamp.join");
    for replicas in [2, 8, 32] {
        let system = build_system(replicas, 8);
        group.bench_with_input(
            BenchmarkId::from_parameter(replicas),
            &system,
            |b, system| {
                b.iter(|| {
                    let mut stamp = system[0].peek();
                    for other in &system[1..] {
                        stamp.join(other.peek());
                    }
                    black_box(stamp)
                });
            },
        );
    }
    group.finish();
}

fn bench_fork(c: &mut Criterion) {
    let system = build_system(32, 8);
    c.bench_function("stamp.fork", |b| {
        b.iter(|| {
            let mut stamp = system[5].clone();
            black_box(stamp.fork().expect("fork"))
        });
    });
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("stamp.codec");
    for replicas in [2, 8, 32] {
        let system = build_system(replicas, 8);
        let stamp = system[0].clone();
        let bytes = stamp.marshal();
        group.bench_with_input(BenchmarkId::new("marshal", replicas), &stamp, |b, stamp| {
            b.iter(|| black_box(stamp.marshal()));
        });
        group.bench_with_input(BenchmarkId::new("unmarshal", replicas), &bytes, |b, bytes| {
            b.iter(|| black_box(Stamp::unmarshal(bytes).expect("decode")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_event, bench_join, bench_fork, bench_codec);
criterion_main!(benches);
