use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pagecomb::CombAlloc;

fn bench_alloc_free_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_free_churn");

    group.bench_function("pagecomb_groups", |b| {
        b.iter(|| {
            let alloc: CombAlloc<u64> = CombAlloc::new();
            let mut blocks = Vec::with_capacity(512);
            for i in 0..512usize {
                let n = (i % 31) + 1;
                blocks.push((alloc.allocate(n, None), n));
            }
            for (p, n) in blocks.drain(..) {
                unsafe { alloc.deallocate(p, n) };
            }
            black_box(alloc.stats());
        });
    });

    group.bench_function("std_boxed_slices", |b| {
        b.iter(|| {
            let mut blocks = Vec::with_capacity(512);
            for i in 0..512usize {
                let n = (i % 31) + 1;
                blocks.push(vec![0u64; n].into_boxed_slice());
            }
            black_box(blocks);
        });
    });

    group.finish();
}

fn bench_grow_in_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow_one_group");

    // The workload reallocate is built for: a group growing 1 -> 48 while
    // the rest of the page stays put.
    group.bench_function("pagecomb_reallocate", |b| {
        b.iter(|| {
            let alloc: CombAlloc<u64> = CombAlloc::new();
            let anchor = alloc.allocate(16, None);
            let mut p = alloc.allocate(1, None);
            let mut size = 1usize;
            while size < 48 {
                let next = (size * 2).min(48);
                p = unsafe { alloc.reallocate(Some(p), size, next) }.unwrap();
                size = next;
            }
            unsafe {
                alloc.deallocate(p, size);
                alloc.deallocate(anchor, 16);
            }
        });
    });

    group.bench_function("vec_copy_growth", |b| {
        b.iter(|| {
            let mut v: Vec<u64> = Vec::with_capacity(1);
            let mut size = 1usize;
            while size < 48 {
                let next = (size * 2).min(48);
                let mut grown = Vec::with_capacity(next);
                grown.extend_from_slice(&v);
                v = grown;
                size = next;
            }
            black_box(v);
        });
    });

    group.finish();
}

fn bench_hinted_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("hinted_reuse");

    group.bench_function("pagecomb_hint", |b| {
        let alloc: CombAlloc<u64> = CombAlloc::new();
        let anchor = alloc.allocate(8, None);
        b.iter(|| {
            let p = alloc.allocate(12, Some(black_box(anchor)));
            unsafe { alloc.deallocate(p, 12) };
        });
        unsafe { alloc.deallocate(anchor, 8) };
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_alloc_free_churn,
    bench_grow_in_place,
    bench_hinted_reuse
);
criterion_main!(benches);
