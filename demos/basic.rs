//! Basic usage walkthrough

use idlepool::{Pool, PoolConfig, StatsExporter};
use std::time::Duration;

#[derive(Debug)]
struct Connection {
    id: usize,
}

fn main() {
    println!("=== idlepool - Basic Examples ===\n");

    acquire_and_release();
    overflow_and_eviction();
    stats_export();
}

fn acquire_and_release() {
    println!("1. Acquire and release:");

    let pool = Pool::new(PoolConfig::new(|| Ok(Connection { id: 1 }))).unwrap();

    let conn = pool.acquire().unwrap();
    println!("   Got: {conn:?}");
    pool.release(Some(conn)).unwrap();
    println!("   Idle after release: {}", pool.size());

    let conn = pool.acquire().unwrap();
    println!("   Reused: {conn:?} (hits = {})\n", pool.stats().hits);
    pool.release(Some(conn)).unwrap();
}

fn overflow_and_eviction() {
    println!("2. Overflow and staleness:");

    let pool = Pool::new(
        PoolConfig::new(|| Ok(Connection { id: 2 }))
            .with_max_cap(1)
            .with_idle_timeout(Duration::from_millis(50))
            .with_closer(|conn| {
                println!("   Closing {conn:?}");
                Ok(())
            }),
    )
    .unwrap();

    let first = pool.acquire().unwrap();
    let second = pool.acquire().unwrap();
    pool.release(Some(first)).unwrap();
    // Buffer is full; this one is closed instead.
    pool.release(Some(second)).unwrap();

    std::thread::sleep(Duration::from_millis(60));
    // The buffered one went stale; a fresh connection comes back.
    let conn = pool.acquire().unwrap();
    println!("   Got after eviction: {conn:?}");
    println!("   Stale evictions: {}\n", pool.stats().stale_evictions);
    pool.release(Some(conn)).unwrap();
}

fn stats_export() {
    println!("3. Stats:");

    let pool = Pool::new(PoolConfig::new(|| Ok(Connection { id: 3 })).with_initial_cap(2)).unwrap();

    let conn = pool.acquire().unwrap();
    pool.release(Some(conn)).unwrap();

    println!("   {}", pool.stats());
    println!("{}", StatsExporter::export_prometheus(&pool.stats(), "demo", None));

    pool.shutdown();
    println!("   Closed: {}", pool.is_closed());
}
