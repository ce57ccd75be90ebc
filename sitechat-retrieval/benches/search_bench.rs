use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sitechat_retrieval::{normalize_l2, FlatIndex};

const DIM: usize = 384;

fn pseudo_random_vectors(n: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            let mut v: Vec<f32> = (0..DIM)
                .map(|_| {
                    state = state
                        .wrapping_mul(6_364_136_223_846_793_005)
                        .wrapping_add(1_442_695_040_888_963_407);
                    ((state >> 33) as f32 / u32::MAX as f32) - 0.25
                })
                .collect();
            normalize_l2(&mut v);
            v
        })
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_search");

    for size in [500usize, 2000, 5000] {
        let mut index = FlatIndex::new(DIM);
        index.add(&pseudo_random_vectors(size, 7)).unwrap();
        let query = pseudo_random_vectors(1, 99).remove(0);

        group.bench_with_input(BenchmarkId::new("exact_top3", size), &size, |b, _| {
            b.iter(|| index.search(black_box(&query), 3).unwrap())
        });
    }

    group.finish();
}

fn bench_hnsw(c: &mut Criterion) {
    let mut index = FlatIndex::new(DIM);
    index.add(&pseudo_random_vectors(1000, 11)).unwrap();
    let query = pseudo_random_vectors(1, 5).remove(0);

    c.bench_function("hnsw_build_and_search_1000", |b| {
        b.iter(|| index.search_hnsw(black_box(&query), 3).unwrap())
    });
}

criterion_group!(benches, bench_search, bench_hnsw);
criterion_main!(benches);
