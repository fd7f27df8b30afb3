use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use custody::{Shared, Unique};
use std::sync::Arc;

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    group.bench_function("Box::new", |b| {
        b.iter(|| {
            black_box(Box::new(black_box(42_u64)));
        })
    });

    group.bench_function("Unique::new", |b| {
        b.iter(|| {
            black_box(Unique::new(black_box(42_u64)));
        })
    });

    group.bench_function("Arc::new", |b| {
        b.iter(|| {
            black_box(Arc::new(black_box(42_u64)));
        })
    });

    group.bench_function("Shared::new", |b| {
        b.iter(|| {
            black_box(Shared::new(black_box(42_u64)));
        })
    });

    group.bench_function("Shared::from(Unique)", |b| {
        b.iter_batched(
            || Unique::new(42_u64),
            |unique| {
                // Two allocations: the boxed value and the control block.
                black_box(Shared::from(unique));
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_clone(c: &mut Criterion) {
    let mut group = c.benchmark_group("clone");

    group.bench_function("Arc::clone", |b| {
        let arc = Arc::new(42_u64);
        b.iter(|| {
            black_box(arc.clone());
        })
    });

    group.bench_function("Shared::clone", |b| {
        let shared = Shared::new(42_u64);
        b.iter(|| {
            black_box(shared.clone());
        })
    });

    group.finish();
}

fn bench_upgrade(c: &mut Criterion) {
    let mut group = c.benchmark_group("upgrade");

    group.bench_function("std Weak::upgrade", |b| {
        let arc = Arc::new(42_u64);
        let weak = Arc::downgrade(&arc);
        b.iter(|| {
            black_box(weak.upgrade());
        })
    });

    group.bench_function("Weak::lock", |b| {
        let shared = Shared::new(42_u64);
        let weak = shared.downgrade();
        b.iter(|| {
            black_box(weak.lock());
        })
    });

    group.bench_function("Weak::lock expired", |b| {
        let weak = Shared::new(42_u64).downgrade();
        b.iter(|| {
            black_box(weak.lock());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_construction, bench_clone, bench_upgrade);
criterion_main!(benches);
