use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use resource_pool::{IdleTimeout, ManagerFn, Pool, PoolConfig, WaitPolicy};

fn counter_pool(max_size: usize) -> Pool<ManagerFn<usize, ()>> {
    let source = AtomicUsize::new(0);
    PoolConfig::new()
        .max_size(max_size)
        .idle_timeout(IdleTimeout::Never)
        .wait(WaitPolicy::Forever)
        .build(ManagerFn::new(move || Ok(source.fetch_add(1, Ordering::Relaxed))))
        .unwrap()
}

fn borrow_many(pool: &Pool<ManagerFn<usize, ()>>, count: usize) {
    for _ in 0..count {
        let lease = pool.acquire().unwrap().unwrap();
        drop(lease);
    }
}

fn borrow_contended(pool: &Pool<ManagerFn<usize, ()>>, threads: usize, count: usize) {
    let workers: Vec<_> = (0..threads)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || borrow_many(&pool, count))
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}

fn bench_borrow(c: &mut Criterion) {
    let count = 5000;
    let pool = counter_pool(4);
    c.bench_with_input(BenchmarkId::new("borrow-single", count), &count, |b, &s| {
        b.iter(|| borrow_many(&pool, s));
    });
    c.bench_with_input(BenchmarkId::new("borrow-contended-8", count), &count, |b, &s| {
        b.iter(|| borrow_contended(&pool, 8, s / 8));
    });
}

criterion_group!(benches, bench_borrow);
criterion_main!(benches);
