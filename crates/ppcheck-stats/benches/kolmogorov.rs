use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ppcheck_stats::kolmogorov::{kolmogorov_sf_asymptotic, ks_two_sided_pvalue};
use ppcheck_stats::test_uniformity;

fn bench_exact_pvalue(c: &mut Criterion) {
    let mut group = c.benchmark_group("ks_two_sided_pvalue");
    for n in [10_usize, 100, 1_000, 10_000] {
        // Keep n·d² near 1 so the matrix method, not a shortcut, is timed.
        let d = 1.0 / (n as f64).sqrt();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| ks_two_sided_pvalue(black_box(n), black_box(d)));
        });
    }
    group.finish();
}

fn bench_asymptotic(c: &mut Criterion) {
    c.bench_function("kolmogorov_sf_asymptotic", |b| {
        b.iter(|| kolmogorov_sf_asymptotic(black_box(1.1)));
    });
}

fn bench_uniformity_test(c: &mut Criterion) {
    let ranks: Vec<f64> = (0..500).map(|i| (f64::from(i) + 0.5) / 500.0).collect();
    c.bench_function("test_uniformity_500", |b| {
        b.iter(|| test_uniformity(black_box(&ranks)));
    });
}

criterion_group!(
    benches,
    bench_exact_pvalue,
    bench_asymptotic,
    bench_uniformity_test
);
criterion_main!(benches);
