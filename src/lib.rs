//! # idlepool
//!
//! Bounded, thread-safe pool that caches and recycles expensive-to-create
//! resources, canonically network connections.
//!
//! ## Features
//!
//! - Bounded idle buffer with non-blocking acquire/release (lock-free queue
//!   on the hot path, a mutex only for lifecycle transitions)
//! - Create-or-reuse acquisition backed by a user-supplied, fallible factory
//! - Lazy staleness eviction: idle resources older than the configured
//!   timeout are closed at acquisition time, never swept in the background
//! - Overflow policy: releases into a full buffer destroy the resource
//!   through the closer instead of waiting
//! - Optional pre-fill at construction, off by default
//! - Hit/miss/eviction stats with a Prometheus-format text exporter
//!
//! ## Quick Start
//!
//! ```rust
//! use idlepool::{Pool, PoolConfig};
//! use std::time::Duration;
//!
//! let pool = Pool::new(
//!     PoolConfig::new(|| Ok(String::from("connection")))
//!         .with_max_cap(10)
//!         .with_idle_timeout(Duration::from_secs(15)),
//! )
//! .unwrap();
//!
//! let conn = pool.acquire().unwrap();
//! pool.release(Some(conn)).unwrap();
//! assert_eq!(pool.size(), 1);
//!
//! pool.shutdown();
//! ```

mod config;
mod errors;
mod pool;
mod stats;

pub use config::{Closer, DEFAULT_MAX_CAP, Factory, PoolConfig};
pub use errors::{BoxedError, PoolError, PoolResult};
pub use pool::Pool;
pub use stats::{PoolStats, StatsExporter};
