use chart_numerics::distribution::{Bandwidth, BoxStats, Kde, Kernel};
use chart_numerics::{Agglomerative, Average, DistanceMatrix, Point, TieBreak};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::prelude::*;

fn grid(x: u32, y: u32) -> (Vec<String>, Vec<Point>) {
    /// (1+√3)/2
    const PERTURBATION: f64 = 1.366_025_403_784_438_6;
    (0..x)
        .flat_map(|x| (0..y).map(move |y| (x, y)))
        .map(|(x, y)| {
            (
                format!("{x}/{y}"),
                array![f64::from(x), PERTURBATION * f64::from(y)],
            )
        })
        .unzip()
}

pub fn linkage(c: &mut Criterion) {
    for (x, y) in [(4, 5), (5, 10), (10, 10)] {
        let (labels, points) = grid(x, y);
        let matrix = DistanceMatrix::squared_euclidean(labels, &points).unwrap();
        c.bench_function(&format!("{x}×{y} grid, ward"), |b| {
            b.iter(|| Agglomerative::ward().run(black_box(&matrix)));
        });
        c.bench_function(&format!("{x}×{y} grid, ward, insertion-order"), |b| {
            b.iter(|| {
                Agglomerative::ward()
                    .tie_break(TieBreak::InsertionOrder)
                    .run(black_box(&matrix))
            });
        });
        c.bench_function(&format!("{x}×{y} grid, average"), |b| {
            b.iter(|| Agglomerative::new(Average).run(black_box(&matrix)));
        });
    }
}

pub fn distributions(c: &mut Criterion) {
    let sample: Vec<f64> = Array1::linspace(0.0, 1.0, 1_000)
        .mapv(|x: f64| (x * 17.0).sin() * x)
        .to_vec();
    c.bench_function("1000 values, box stats", |b| {
        b.iter(|| BoxStats::tukey(black_box(&sample)));
    });
    for kernel in [Kernel::Epanechnikov, Kernel::Gaussian] {
        let kde = Kde::new(kernel, Bandwidth::Silverman);
        c.bench_function(&format!("1000 values, {kernel:?} kde on 200 points"), |b| {
            b.iter(|| kde.estimate_evenly(black_box(&sample), 200));
        });
    }
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = linkage, distributions
);
criterion_main!(benches);
