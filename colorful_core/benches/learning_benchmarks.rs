//! Performance benchmarks for scoring and learning
//!
//! Run with: cargo bench --bench learning_benchmarks

use colorful_core::{
    CategoryModel, Color, ConstrainedAdapter, GoalBuilder, Metric, ScoringEngine,
    StatisticalAdapter,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn preset() -> CategoryModel {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/kb_colors_preset.csv");
    CategoryModel::load_csv(path).expect("preset loads")
}

fn context(size: usize) -> Vec<Color> {
    (0..size)
        .map(|i| Color::new(15.0 + 25.0 * i as f64, 85.0, 50.0).expect("valid colour"))
        .collect()
}

/// Benchmark scoring for growing observation contexts
fn bench_scoring(c: &mut Criterion) {
    let engine = ScoringEngine::default();
    let model = preset();
    let mut group = c.benchmark_group("score_model");
    for size in [1, 2, 4] {
        let colors = context(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &colors, |b, colors| {
            b.iter(|| black_box(engine.score_model(&model, colors)));
        });
    }
    group.finish();
}

/// Benchmark one statistical update
fn bench_statistical(c: &mut Criterion) {
    let adapter = StatisticalAdapter::default();
    let model = preset();
    let red = model.get("red").expect("preset has red").clone();
    let sample = Color::new(355.0, 80.0, 45.0).expect("valid colour");
    c.bench_function("statistical_candidate", |b| {
        b.iter(|| black_box(adapter.candidate(&red, &sample)));
    });
}

/// Benchmark one constrained adaptation from a fresh model
fn bench_constrained(c: &mut Criterion) {
    let model = preset();
    let colors = context(2);
    let table = ScoringEngine::default().score_model(&model, &colors);
    let goal = GoalBuilder::default()
        .naive(&table, 1, "red")
        .expect("red is in the preset");

    let mut group = c.benchmark_group("constrained");
    group.sample_size(10);
    group.bench_function("single_goal", |b| {
        b.iter(|| {
            let mut working = model.clone();
            let report = ConstrainedAdapter::default()
                .adapt(&mut working, &colors, &[goal.clone()], Metric::Acc, f64::INFINITY)
                .expect("adaptation runs");
            black_box(report.outcome)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_scoring, bench_statistical, bench_constrained);
criterion_main!(benches);
