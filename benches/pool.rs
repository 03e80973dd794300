//! Acquire/release round-trip benchmark at several pool sizes.

use criterion::{Criterion, criterion_group, criterion_main};
use idlepool::{Pool, PoolConfig};
use std::time::Duration;

#[derive(Debug)]
struct Conn {
    _buf: Vec<u8>,
}

fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_release");

    for pool_size in [10usize, 100, 500] {
        let pool = Pool::new(
            PoolConfig::new(|| {
                Ok(Conn {
                    _buf: Vec::with_capacity(1024),
                })
            })
            .with_max_cap(pool_size)
            .with_idle_timeout(Duration::from_secs(15))
            .with_closer(|_conn| Ok(())),
        )
        .unwrap();

        group.bench_function(format!("{pool_size}_conns"), |b| {
            b.iter(|| {
                let conn = pool.acquire().unwrap();
                pool.release(Some(conn)).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_acquire_release);
criterion_main!(benches);
