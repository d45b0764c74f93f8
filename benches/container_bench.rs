use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rbits::{aggregate, Container, RoaringBitmap};

fn bench_containers(c: &mut Criterion) {
    let mut group = c.benchmark_group("container");
    let sparse = (0..4000u32).fold(Container::new(), |c, v| c.add((v * 13) as u16)); // array
    let dense = (0..30000u32).fold(Container::new(), |c, v| c.add((v * 2) as u16)); // bitmap
    let runs = Container::from_range(1000, 50000).unwrap(); // single run

    group.bench_function("contains", |b| {
        b.iter(|| {
            for v in 0..=u16::MAX {
                black_box(sparse.contains(v));
                black_box(dense.contains(v));
                black_box(runs.contains(v));
            }
        })
    });

    group.bench_function("and_array_bitmap", |b| b.iter(|| black_box(sparse.and(&dense))));
    group.bench_function("or_bitmap_run", |b| b.iter(|| black_box(dense.or(&runs))));
    group.bench_function("xor_array_run", |b| b.iter(|| black_box(sparse.xor(&runs))));
    group.bench_function("run_optimize", |b| {
        b.iter(|| black_box(dense.clone().run_optimize()))
    });
    group.finish();
}

fn bench_bitmaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("roaring");
    let a: RoaringBitmap = (0..2_000_000u32).step_by(3).collect();
    let b: RoaringBitmap = (1_000_000..3_000_000u32).step_by(5).collect();
    let parts: Vec<RoaringBitmap> = (0..8u32)
        .map(|i| (i * 100_000..i * 100_000 + 500_000).step_by(7).collect())
        .collect();

    group.bench_function("and", |bench| bench.iter(|| black_box(&a & &b)));
    group.bench_function("or", |bench| bench.iter(|| black_box(&a | &b)));
    group.bench_function("or_assign", |bench| {
        bench.iter(|| {
            let mut x = a.clone();
            x |= &b;
            black_box(x)
        })
    });
    group.bench_function("aggregate_or", |bench| {
        bench.iter(|| black_box(aggregate::or(&parts)))
    });

    let bytes = a.to_bytes();
    group.bench_function("serialize", |bench| bench.iter(|| black_box(a.to_bytes())));
    group.bench_function("deserialize", |bench| {
        bench.iter(|| black_box(RoaringBitmap::from_bytes(&bytes)))
    });
    group.finish();
}

criterion_group!(benches, bench_containers, bench_bitmaps);
criterion_main!(benches);
