//! Benchmark for fitting and exporting the pipeline
//!
//! Run with: cargo bench --bench fit_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use penguin_export::export::{ModelExporter, OnnxExporter, PmmlExporter};
use penguin_export::pipeline::{
    fit_pipeline, CategoricalColumn, ClassMapping, NumericColumn, SolverConfig, TrainingSet,
};

/// Generate an overlapping two-class training set with a few gaps
fn generate_training_set(n_rows: usize, n_numeric: usize, seed: u64) -> TrainingSet {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let target: Vec<u8> = (0..n_rows).map(|i| (i % 2) as u8).collect();

    let numeric = (0..n_numeric)
        .map(|j| {
            let values = target
                .iter()
                .map(|&t| {
                    // ~2% missing
                    if rng.gen::<f64>() < 0.02 {
                        None
                    } else {
                        Some(rng.gen::<f64>() * 10.0 + f64::from(t) * (j as f64 + 1.0))
                    }
                })
                .collect();
            NumericColumn {
                name: format!("feature_{}", j),
                values,
            }
        })
        .collect();

    let islands = ["Biscoe", "Dream", "Torgersen"];
    let categorical = vec![CategoricalColumn {
        name: "island".to_string(),
        values: (0..n_rows)
            .map(|_| Some(islands[rng.gen_range(0..islands.len())].to_string()))
            .collect(),
    }];

    TrainingSet {
        numeric,
        categorical,
        target,
        classes: ClassMapping::default(),
    }
}

fn benchmark_fit_by_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_by_rows");
    group.sample_size(20);

    for n_rows in [300, 3_000, 30_000] {
        let data = generate_training_set(n_rows, 4, 42);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &data, |b, data| {
            b.iter(|| fit_pipeline(black_box(data), &SolverConfig::default()).unwrap())
        });
    }

    group.finish();
}

fn benchmark_fit_by_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_by_features");
    group.sample_size(20);

    for n_numeric in [2, 10, 50] {
        let data = generate_training_set(5_000, n_numeric, 7);
        group.bench_with_input(BenchmarkId::from_parameter(n_numeric), &data, |b, data| {
            b.iter(|| fit_pipeline(black_box(data), &SolverConfig::default()).unwrap())
        });
    }

    group.finish();
}

fn benchmark_encode(c: &mut Criterion) {
    let data = generate_training_set(1_000, 10, 3);
    let model = fit_pipeline(&data, &SolverConfig::default()).unwrap();

    let mut group = c.benchmark_group("encode");
    group.bench_function("onnx", |b| {
        b.iter(|| OnnxExporter::default().encode(black_box(&model)).unwrap())
    });
    group.bench_function("pmml", |b| {
        b.iter(|| PmmlExporter::default().encode(black_box(&model)).unwrap())
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_fit_by_rows,
    benchmark_fit_by_features,
    benchmark_encode
);
criterion_main!(benches);
