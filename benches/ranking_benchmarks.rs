//! Performance benchmarks for pool ranking and uncertainty sampling
//!
//! Run with: cargo bench --bench ranking_benchmarks

use active_learning_core::{
    margin_uncertainty, predictive_entropy, variation_ratio, ClassifierConfig, Heuristic, Margin,
    PredictionSamples, PredictiveEntropy, ReplicationMode, SoftmaxClassifier, SyntheticConfig,
    SyntheticDataset, UncertaintySampler, VariationRatio,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic_outputs(
    pool_size: usize,
    mc_iterations: usize,
    num_classes: usize,
) -> Vec<PredictionSamples> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..pool_size)
        .map(|_| {
            let mut probs = Array2::zeros((mc_iterations, num_classes));
            for mut row in probs.rows_mut() {
                let mut total = 0.0;
                for cell in row.iter_mut() {
                    *cell = rng.gen::<f32>().max(1e-3);
                    total += *cell;
                }
                for cell in row.iter_mut() {
                    *cell /= total;
                }
            }
            PredictionSamples::new(probs)
        })
        .collect()
}

/// Benchmark heuristic ranking at different pool sizes
fn bench_heuristic_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("heuristic_ranking");

    for size in [100, 1_000, 10_000].iter() {
        let outputs = synthetic_outputs(*size, 20, 10);

        group.bench_with_input(BenchmarkId::new("entropy", size), size, |b, _| {
            b.iter(|| {
                black_box(PredictiveEntropy.rank(&outputs));
            });
        });

        group.bench_with_input(BenchmarkId::new("margin", size), size, |b, _| {
            b.iter(|| {
                black_box(Margin.rank(&outputs));
            });
        });

        group.bench_with_input(BenchmarkId::new("variation_ratio", size), size, |b, _| {
            b.iter(|| {
                black_box(VariationRatio.rank(&outputs));
            });
        });
    }

    group.finish();
}

/// Benchmark per-sample scores in isolation
fn bench_single_scores(c: &mut Criterion) {
    let outputs = synthetic_outputs(1, 20, 10);
    let sample = &outputs[0];

    c.bench_function("predictive_entropy", |b| {
        b.iter(|| {
            black_box(predictive_entropy(sample));
        });
    });

    c.bench_function("margin_uncertainty", |b| {
        b.iter(|| {
            black_box(margin_uncertainty(sample));
        });
    });

    c.bench_function("variation_ratio", |b| {
        b.iter(|| {
            black_box(variation_ratio(sample));
        });
    });
}

/// Benchmark Monte-Carlo sampling in both replication modes
fn bench_prediction_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction_sampling");
    group.sample_size(20);

    for pool_size in [100, 500].iter() {
        let data = SyntheticDataset::generate(SyntheticConfig {
            samples_per_class: pool_size / 10 + 1,
            ..SyntheticConfig::default()
        });
        let (samples, _) = data.split(1.0);
        let pool: Vec<_> = samples.iter().take(*pool_size).collect();
        let classifier = SoftmaxClassifier::new(ClassifierConfig::default());

        group.bench_with_input(BenchmarkId::new("in_memory", pool_size), pool_size, |b, _| {
            b.iter(|| {
                black_box(
                    classifier
                        .sample_predictions(&pool, 20, ReplicationMode::InMemory)
                        .unwrap(),
                );
            });
        });

        group.bench_with_input(
            BenchmarkId::new("sequential", pool_size),
            pool_size,
            |b, _| {
                b.iter(|| {
                    black_box(
                        classifier
                            .sample_predictions(&pool, 20, ReplicationMode::Sequential)
                            .unwrap(),
                    );
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_heuristic_ranking,
    bench_single_scores,
    bench_prediction_sampling,
);

criterion_main!(benches);
