//! Benchmarks the instrumentation hook's hot path: a base-phase sample
//! walking a synthetically deep chain of branch exits.

use criterion::{criterion_group, criterion_main, Criterion};

use covergrad_core::predicate::FCMP_OGT;
use covergrad_core::{Config, Runtime};

const DEPTH: usize = 50;
const BR_COUNT: usize = 2_000;

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("create tempdir");
    std::fs::write(dir.path().join("instrumentation_meta.txt"), format!("{BR_COUNT} 0")).unwrap();

    // A single chain of `DEPTH` true-exits, then the remaining exits as
    // isolated roots, to approximate a realistically deep but narrow tree
    // alongside a wide field of unexplored siblings.
    let mut edges = String::new();
    for i in 1..DEPTH {
        edges.push_str(&format!("{} {}\n", i - 1, i));
    }
    std::fs::write(dir.path().join("edges.txt"), edges).unwrap();
    dir
}

fn bench_pen_base_phase(c: &mut Criterion) {
    let dir = fixture_dir();
    let config = Config::with_dir(dir.path());
    let mut runtime = Runtime::initialize(&config).expect("load fixture tree");
    runtime.begin_base_phase();

    c.bench_function("pen_base_phase_chain_walk", |b| {
        b.iter(|| {
            for i in 0..DEPTH as i32 {
                runtime.pen(5.0, 0.0, i, FCMP_OGT, false);
            }
        });
    });
}

criterion_group!(benches, bench_pen_base_phase);
criterion_main!(benches);
