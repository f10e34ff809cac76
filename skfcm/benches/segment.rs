//! Benchmarks for SKFCM segmentation.
//! Run with: cargo bench -p skfcm --bench segment

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use skfcm::{
    update_memberships, Buffer2, ClusterCenters, Config, CyclicClassIndices, MembershipMatrix,
    Segmenter,
};

fn test_image(width: usize, height: usize) -> Buffer2<f64> {
    // Three horizontal bands with a mild ramp.
    Buffer2::from_fn(width, height, |x, y| {
        let band = (3 * y / height) as f64 * 90.0;
        band + (x % 16) as f64
    })
}

fn membership_update_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_memberships");
    let config = Config::default().with_classes(3);
    let centers = ClusterCenters::from_values(vec![10.0, 100.0, 190.0]);

    for (width, height) in [(64, 64), (256, 256)] {
        let image = test_image(width, height);
        let previous =
            MembershipMatrix::one_hot(width, height, 3, &mut CyclicClassIndices::new());
        let mut memberships = previous.clone();

        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_function(
            BenchmarkId::new("size", format!("{}x{}", width, height)),
            |b| {
                b.iter(|| {
                    update_memberships(
                        black_box(&image),
                        black_box(&previous),
                        &centers,
                        &config,
                        &mut memberships,
                    )
                    .unwrap();
                });
            },
        );
    }

    group.finish();
}

fn segment_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment");
    group.sample_size(10);

    for (width, height) in [(64, 64), (128, 128)] {
        let image = test_image(width, height);
        let segmenter = Segmenter::new(
            Config::default()
                .with_classes(3)
                .with_max_iterations(20),
        )
        .unwrap();

        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_with_input(
            BenchmarkId::new("size", format!("{}x{}", width, height)),
            &image,
            |b, image| {
                b.iter(|| black_box(segmenter.segment(black_box(image)).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, membership_update_benchmarks, segment_benchmarks);
criterion_main!(benches);
