//! Coverage allocation benchmarks
//!
//! - Bucketed selection over pools of increasing size
//! - Full start_session round trip against the in-memory store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dilemma_study::coverage::{select, PoolCounts};
use dilemma_study::record::TrialId;
use dilemma_study::request::StartRequest;
use dilemma_study::store::MemoryStudyStore;
use dilemma_study::Study;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

/// Pool of `size` trials with counts spread over a few buckets
fn create_pool(size: u64) -> PoolCounts {
    (1..=size).map(|id| (TrialId::new(id), id % 5)).collect()
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("coverage_select");

    for size in [100_u64, 1_000, 10_000] {
        let pool = create_pool(size);
        let mut rng = StdRng::seed_from_u64(42);

        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| black_box(select(pool, 10, &mut rng)));
        });
    }

    group.finish();
}

fn bench_start_session(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("start_session");

    for trials in [100_usize, 1_000] {
        let store = MemoryStudyStore::with_trials((0..trials).map(|i| json!({"dilemma_text": format!("d{i}")})));
        let study = Study::builder(store).block_size(10).seed(7).build().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(trials), &study, |b, study| {
            b.to_async(&rt)
                .iter(|| async { black_box(study.start_session(StartRequest::default()).await.unwrap()) });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_select, bench_start_session);
criterion_main!(benches);
