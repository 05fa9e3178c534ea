//! Ordo Benchmarks
//!
//! Cost of the cell combinators and of the raw accessor they sit on.
//! Run with: `cargo bench --package ordo`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ordo::capability::{CallerIdentity, CapabilityGate};
use ordo::location::{Location, OrderingMode, ValueKind};
use ordo::memory::MemoryAccessor;
use ordo::AtomicCell;
use std::sync::Arc;

fn bench_cell_basic(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_basic");
    let cell = AtomicCell::new(0i64);

    group.bench_function("get", |b| b.iter(|| black_box(cell.get())));

    group.bench_function("set", |b| b.iter(|| cell.set(black_box(7))));

    group.bench_function("lazy_set", |b| b.iter(|| cell.lazy_set(black_box(7))));

    group.bench_function("compare_and_set", |b| {
        b.iter(|| {
            let current = cell.get();
            black_box(cell.compare_and_set(current, current + 1))
        })
    });

    group.finish();
}

fn bench_cell_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_update");
    group.throughput(Throughput::Elements(1));
    let cell = AtomicCell::new(0i64);

    group.bench_function("increment_and_get", |b| {
        b.iter(|| black_box(cell.increment_and_get()))
    });

    group.bench_function("get_and_update", |b| {
        b.iter(|| black_box(cell.get_and_update(|v| v.wrapping_mul(3).wrapping_add(1))))
    });

    group.bench_function("accumulate_and_get_max", |b| {
        b.iter(|| black_box(cell.accumulate_and_get(black_box(42), i64::max)))
    });

    group.finish();
}

fn bench_cell_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_contended");
    let per_thread = 10_000u64;

    for threads in [2usize, 4] {
        group.throughput(Throughput::Elements(per_thread * threads as u64));
        group.bench_function(format!("{}_threads", threads), |b| {
            b.iter(|| {
                let cell = Arc::new(AtomicCell::new(0i64));
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let cell = Arc::clone(&cell);
                        std::thread::spawn(move || {
                            for _ in 0..per_thread {
                                cell.increment_and_get();
                            }
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
                black_box(cell.get())
            })
        });
    }

    group.finish();
}

fn bench_raw_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_access");
    let cap = CapabilityGate::new()
        .acquire(&CallerIdentity::platform("bench"))
        .unwrap();
    let mem = MemoryAccessor::new(&cap);
    let addr = mem.allocate(64).unwrap();
    let slot = Location::address(addr, ValueKind::I64);

    for mode in [OrderingMode::Plain, OrderingMode::Volatile] {
        group.bench_function(format!("get_i64_{:?}", mode), |b| {
            b.iter(|| black_box(unsafe { mem.get_i64(slot, mode) }))
        });
        group.bench_function(format!("put_i64_{:?}", mode), |b| {
            b.iter(|| unsafe { mem.put_i64(slot, mode, black_box(3)) })
        });
    }

    group.bench_function("compare_and_swap_i64", |b| {
        b.iter(|| unsafe {
            let current = mem.get_i64(slot, OrderingMode::Volatile);
            black_box(mem.compare_and_swap_i64(slot, current, current + 1))
        })
    });

    group.bench_function("full_fence", |b| b.iter(|| mem.fences().full_fence()));

    unsafe { mem.free(addr) };
    group.finish();
}

fn bench_buffers(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffers");
    let cap = CapabilityGate::new()
        .acquire(&CallerIdentity::platform("bench"))
        .unwrap();
    let mem = MemoryAccessor::new(&cap);

    for size in [16i64, 4096] {
        group.bench_function(format!("allocate_free_{}", size), |b| {
            b.iter(|| {
                let addr = mem.allocate(black_box(size)).unwrap();
                unsafe { mem.free(addr) };
            })
        });
    }

    let src = mem.allocate(4096).unwrap();
    let dst = mem.allocate(4096).unwrap();
    group.throughput(Throughput::Bytes(4096));
    group.bench_function("copy_4k", |b| {
        b.iter(|| unsafe {
            mem.copy(
                Location::address(src, ValueKind::I64),
                Location::address(dst, ValueKind::I64),
                4096,
            )
        })
    });
    group.bench_function("fill_4k", |b| {
        b.iter(|| unsafe { mem.fill(Location::address(dst, ValueKind::I64), 4096, black_box(0xAB)) })
    });
    unsafe {
        mem.free(src);
        mem.free(dst);
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_cell_basic,
    bench_cell_update,
    bench_cell_contended,
    bench_raw_access,
    bench_buffers
);

criterion_main!(benches);
