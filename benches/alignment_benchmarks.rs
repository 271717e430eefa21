use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gapalign::{align, AlignOptions, AlignmentMode, Scoring};

fn generate_test_sequence(length: usize, phase: usize) -> Vec<u8> {
    let pattern = b"ATCGGATCCA";
    (0..length)
        .map(|i| pattern[(i * 7 + phase) % pattern.len()])
        .collect()
}

fn bench_global_full(c: &mut Criterion) {
    let reference = generate_test_sequence(1000, 0);
    let query = generate_test_sequence(1000, 3);
    let scoring = Scoring::default();
    let options = AlignOptions::default();

    c.bench_function("global_full_1kb", |b| {
        b.iter(|| {
            align(
                black_box(&reference),
                black_box(&query),
                AlignmentMode::Global,
                &scoring,
                &options,
            )
        })
    });
}

fn bench_global_score_only(c: &mut Criterion) {
    let reference = generate_test_sequence(1000, 0);
    let query = generate_test_sequence(1000, 3);
    let scoring = Scoring::default();
    let options = AlignOptions {
        score_only: true,
        ..AlignOptions::default()
    };

    c.bench_function("global_score_1kb", |b| {
        b.iter(|| {
            align(
                black_box(&reference),
                black_box(&query),
                AlignmentMode::Global,
                &scoring,
                &options,
            )
        })
    });
}

fn bench_local_full(c: &mut Criterion) {
    let reference = generate_test_sequence(1000, 0);
    let query = generate_test_sequence(300, 5);
    let scoring = Scoring::default();
    let options = AlignOptions::default();

    c.bench_function("local_full_1kb_x_300", |b| {
        b.iter(|| {
            align(
                black_box(&reference),
                black_box(&query),
                AlignmentMode::Local,
                &scoring,
                &options,
            )
        })
    });
}

fn bench_glocal_score_only(c: &mut Criterion) {
    let reference = generate_test_sequence(2000, 0);
    let query = generate_test_sequence(200, 5);
    let scoring = Scoring::default();
    let options = AlignOptions {
        score_only: true,
        ..AlignOptions::default()
    };

    c.bench_function("glocal_score_2kb_x_200", |b| {
        b.iter(|| {
            align(
                black_box(&reference),
                black_box(&query),
                AlignmentMode::Glocal,
                &scoring,
                &options,
            )
        })
    });
}

criterion_group!(
    benches,
    bench_global_full,
    bench_global_score_only,
    bench_local_full,
    bench_glocal_score_only
);
criterion_main!(benches);
