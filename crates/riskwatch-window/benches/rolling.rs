use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use riskwatch_window::{direct_stats, RollingWindow};

fn signal(n: usize) -> Vec<f64> {
    (0..n).map(|i| (i as f64 * 0.013).sin() * 3.0 + 10.0).collect()
}

fn bench_rolling(c: &mut Criterion) {
    let values = signal(10_000);
    let mut group = c.benchmark_group("rolling_stats");

    for window in [14usize, 48, 256] {
        group.bench_with_input(BenchmarkId::new("incremental", window), &window, |b, &w| {
            b.iter(|| {
                let mut rw = RollingWindow::new(w);
                let mut acc = 0.0;
                for v in &values {
                    rw.push(*v);
                    if let Some(s) = rw.stats() {
                        acc += s.std;
                    }
                }
                black_box(acc)
            })
        });

        group.bench_with_input(BenchmarkId::new("direct", window), &window, |b, &w| {
            b.iter(|| {
                let mut acc = 0.0;
                for i in 0..values.len() {
                    let start = (i + 1).saturating_sub(w);
                    if let Some(s) = direct_stats(&values[start..=i]) {
                        acc += s.std;
                    }
                }
                black_box(acc)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_rolling);
criterion_main!(benches);
