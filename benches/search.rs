use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use study_rag::embeddings::EmbeddingVector;
use study_rag::index::VectorIndex;

const DIMENSION: usize = 384;

/// Deterministic pseudo-random vectors so runs are comparable
fn vectors(count: usize) -> Vec<EmbeddingVector> {
    let mut state: u32 = 0x9e37_79b9;
    (0..count)
        .map(|_| {
            (0..DIMENSION)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    (state % 1000) as f32 / 1000.0
                })
                .collect()
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for count in [100, 1_000, 10_000] {
        let data = vectors(count + 1);
        let (query, stored) = data.split_last().expect("at least one vector");
        let index = VectorIndex::build(stored).expect("index builds");

        group.bench_with_input(BenchmarkId::new("top 10", count), &index, |b, index| {
            b.iter(|| index.search(black_box(query), black_box(10)))
        });
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
