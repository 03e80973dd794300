//! Core pool implementation

use crate::config::{Closer, DEFAULT_MAX_CAP, Factory, PoolConfig};
use crate::errors::{PoolError, PoolResult};
use crate::stats::{PoolStats, StatsTracker};

use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An idle resource together with the moment it went idle.
struct IdleEntry<T> {
    resource: T,
    entered_idle_at: Instant,
}

impl<T> IdleEntry<T> {
    fn new(resource: T) -> Self {
        Self {
            resource,
            entered_idle_at: Instant::now(),
        }
    }

    fn is_stale(&self, timeout: Duration) -> bool {
        self.entered_idle_at.elapsed() > timeout
    }
}

/// State that exists only while the pool is open. `shutdown` takes it out
/// of the pool atomically, the way the original nils its buffer reference.
struct Live<T> {
    idle: Arc<ArrayQueue<IdleEntry<T>>>,
    factory: Factory<T>,
}

impl<T> Clone for Live<T> {
    fn clone(&self) -> Self {
        Self {
            idle: Arc::clone(&self.idle),
            factory: Arc::clone(&self.factory),
        }
    }
}

struct PoolInner<T> {
    // Guards lifecycle transitions only; steady-state traffic clones the
    // Arcs out and works on the queue's own synchronization.
    live: Mutex<Option<Live<T>>>,
    // Deliberately outside `live`: a resource released after shutdown must
    // still be closed for real, and the shutdown drain uses this same
    // reference.
    closer: Option<Closer<T>>,
    idle_timeout: Option<Duration>,
    stats: StatsTracker,
}

impl<T> PoolInner<T> {
    fn live(&self) -> Option<Live<T>> {
        self.live.lock().clone()
    }

    fn close_resource(&self, resource: T) -> PoolResult<()> {
        match &self.closer {
            Some(closer) => closer(resource).map_err(PoolError::Closer),
            None => Ok(()),
        }
    }

    /// Close a stale entry pulled during acquisition. The caller asked for
    /// a resource, not a cleanup report, so a closer failure is recorded in
    /// the stats and logged instead of propagated.
    fn discard_stale(&self, resource: T) {
        let close_failed = match &self.closer {
            Some(closer) => match closer(resource) {
                Ok(()) => false,
                Err(err) => {
                    tracing::warn!(error = %err, "closing stale idle resource failed");
                    true
                }
            },
            None => false,
        };
        self.stats.record_stale_eviction(close_failed);
    }
}

/// Bounded, thread-safe pool of reusable resources.
///
/// `Pool` is a cheap-to-clone handle; clones share the same state. Callers
/// [`acquire`](Pool::acquire) a resource (reusing an idle one when fresh,
/// creating one otherwise) and [`release`](Pool::release) it back. Idle
/// resources beyond capacity, stale resources, and everything left at
/// [`shutdown`](Pool::shutdown) go through the configured closer.
///
/// Neither `acquire` nor `release` ever blocks on the pool itself; only the
/// user-supplied factory and closer may block.
///
/// # Examples
///
/// ```
/// use idlepool::{Pool, PoolConfig};
///
/// let pool = Pool::new(PoolConfig::new(|| Ok(String::from("conn")))).unwrap();
///
/// let conn = pool.acquire()?;        // empty pool: created by the factory
/// pool.release(Some(conn))?;         // back into the idle buffer
/// let conn = pool.acquire()?;        // served from the buffer
/// assert_eq!(pool.stats().hits, 1);
/// # pool.release(Some(conn))?;
/// # Ok::<(), idlepool::PoolError>(())
/// ```
pub struct Pool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send> Pool<T> {
    /// Create a pool from `config`.
    ///
    /// A `max_cap` of zero falls back to [`DEFAULT_MAX_CAP`]. With a
    /// non-zero `initial_cap`, up to `min(initial_cap, max_cap)` resources
    /// are created eagerly; if the factory fails mid-fill, the resources
    /// created so far are closed and the factory error is returned.
    pub fn new(config: PoolConfig<T>) -> PoolResult<Self> {
        let max_cap = if config.max_cap == 0 {
            DEFAULT_MAX_CAP
        } else {
            config.max_cap
        };

        let idle = Arc::new(ArrayQueue::new(max_cap));
        let inner = Arc::new(PoolInner {
            live: Mutex::new(Some(Live {
                idle: Arc::clone(&idle),
                factory: Arc::clone(&config.factory),
            })),
            closer: config.closer,
            idle_timeout: config.idle_timeout,
            stats: StatsTracker::default(),
        });

        for _ in 0..config.initial_cap.min(max_cap) {
            match (config.factory)() {
                Ok(resource) => {
                    let _ = idle.push(IdleEntry::new(resource));
                }
                Err(err) => {
                    // Undo the partial fill; the fill error is the one the
                    // caller needs to see.
                    while let Some(entry) = idle.pop() {
                        let _ = inner.close_resource(entry.resource);
                    }
                    return Err(PoolError::Factory(err));
                }
            }
        }

        Ok(Self { inner })
    }

    /// Obtain a resource, reusing a fresh idle one when available.
    ///
    /// Stale idle resources (older than the configured idle timeout) are
    /// closed and skipped. An empty buffer falls through to the factory,
    /// whose error is propagated verbatim as [`PoolError::Factory`].
    /// Fails with [`PoolError::Closed`] after [`shutdown`](Pool::shutdown).
    pub fn acquire(&self) -> PoolResult<T> {
        let live = self.inner.live().ok_or(PoolError::Closed)?;

        loop {
            match live.idle.pop() {
                Some(entry) => {
                    if let Some(timeout) = self.inner.idle_timeout
                        && entry.is_stale(timeout)
                    {
                        self.inner.discard_stale(entry.resource);
                        continue;
                    }
                    self.inner.stats.record_hit();
                    return Ok(entry.resource);
                }
                None => {
                    let resource = (live.factory)().map_err(PoolError::Factory)?;
                    self.inner.stats.record_miss();
                    return Ok(resource);
                }
            }
        }
    }

    /// Return a resource to the pool.
    ///
    /// The resource is buffered with a fresh idle timestamp. If the buffer
    /// is full, or the pool was shut down, the resource is routed to
    /// [`close`](Pool::close) instead and that result is returned. `None`
    /// fails with [`PoolError::NilResource`].
    pub fn release(&self, resource: Option<T>) -> PoolResult<()> {
        let resource = resource.ok_or(PoolError::NilResource)?;

        let Some(live) = self.inner.live() else {
            return self.inner.close_resource(resource);
        };

        match live.idle.push(IdleEntry::new(resource)) {
            Ok(()) => Ok(()),
            // Buffer full: excess resources are destroyed, never waited on.
            Err(entry) => self.inner.close_resource(entry.resource),
        }
    }

    /// Destroy a single resource via the configured closer.
    ///
    /// Every discarded resource passes through here. Without a closer this
    /// is a no-op and the resource is dropped. `None` fails with
    /// [`PoolError::NilResource`].
    pub fn close(&self, resource: Option<T>) -> PoolResult<()> {
        let resource = resource.ok_or(PoolError::NilResource)?;
        self.inner.close_resource(resource)
    }

    /// Shut the pool down and close every buffered resource.
    ///
    /// Idempotent. After this call [`acquire`](Pool::acquire) fails with
    /// [`PoolError::Closed`] and [`release`](Pool::release) routes straight
    /// to the closer. Closer errors during the drain are logged, not
    /// propagated.
    pub fn shutdown(&self) {
        let Some(live) = self.inner.live.lock().take() else {
            return;
        };

        let mut drained = 0usize;
        while let Some(entry) = live.idle.pop() {
            if let Err(err) = self.inner.close_resource(entry.resource) {
                tracing::warn!(error = %err, "closing resource during shutdown failed");
            }
            drained += 1;
        }
        tracing::debug!(drained, "pool shut down");
    }

    /// Current idle-buffer length. A snapshot, not a lock-consistent count
    /// of everything outstanding. Zero after shutdown.
    pub fn size(&self) -> usize {
        self.inner.live().map_or(0, |live| live.idle.len())
    }

    /// Whether [`shutdown`](Pool::shutdown) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.live.lock().is_none()
    }

    /// Best-effort snapshot of the pool's counters.
    pub fn stats(&self) -> PoolStats {
        self.inner.stats.snapshot(self.size())
    }

    /// Log the current stats snapshot at info level.
    pub fn log_stats(&self) {
        let stats = self.stats();
        tracing::info!(
            hits = stats.hits,
            misses = stats.misses,
            total_idle = stats.total_idle,
            stale_evictions = stats.stale_evictions,
            eviction_close_failures = stats.eviction_close_failures,
            "pool stats",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Stand-in for a connection; the id makes identity checks possible.
    #[derive(Debug, PartialEq, Eq)]
    struct Conn {
        id: usize,
    }

    /// Factory handing out sequential ids, plus its creation counter.
    fn counting_factory() -> (impl Fn() -> Result<Conn, crate::BoxedError>, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let factory = move || {
            Ok(Conn {
                id: counter.fetch_add(1, Ordering::SeqCst),
            })
        };
        (factory, created)
    }

    /// Closer recording the ids it was handed.
    fn recording_closer() -> (impl Fn(Conn) -> Result<(), crate::BoxedError>, Arc<Mutex<Vec<usize>>>) {
        let closed = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&closed);
        let closer = move |conn: Conn| {
            log.lock().push(conn.id);
            Ok(())
        };
        (closer, closed)
    }

    #[test]
    fn miss_then_hit_returns_same_resource() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(PoolConfig::new(factory).with_max_cap(1)).unwrap();

        let conn = pool.acquire().unwrap();
        let id = conn.id;
        pool.release(Some(conn)).unwrap();

        let conn = pool.acquire().unwrap();
        assert_eq!(conn.id, id);

        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn overflow_release_closes_excess_exactly_once() {
        let (factory, _) = counting_factory();
        let (closer, closed) = recording_closer();
        let pool = Pool::new(PoolConfig::new(factory).with_max_cap(2).with_closer(closer)).unwrap();

        let conns: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        for conn in conns {
            pool.release(Some(conn)).unwrap();
        }

        assert_eq!(pool.size(), 2);
        assert_eq!(closed.lock().len(), 1);
    }

    #[test]
    fn stale_resource_is_evicted_and_closed() {
        let (factory, _) = counting_factory();
        let (closer, closed) = recording_closer();
        let pool = Pool::new(
            PoolConfig::new(factory)
                .with_max_cap(1)
                .with_idle_timeout(Duration::from_millis(10))
                .with_closer(closer),
        )
        .unwrap();

        let conn = pool.acquire().unwrap();
        let stale_id = conn.id;
        pool.release(Some(conn)).unwrap();

        thread::sleep(Duration::from_millis(20));

        let conn = pool.acquire().unwrap();
        assert_ne!(conn.id, stale_id);
        assert_eq!(*closed.lock(), vec![stale_id]);

        let stats = pool.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.stale_evictions, 1);
    }

    #[test]
    fn disabled_idle_timeout_never_evicts() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(PoolConfig::new(factory).with_max_cap(1)).unwrap();

        let conn = pool.acquire().unwrap();
        let id = conn.id;
        pool.release(Some(conn)).unwrap();

        thread::sleep(Duration::from_millis(20));

        assert_eq!(pool.acquire().unwrap().id, id);
        assert_eq!(pool.stats().hits, 1);
    }

    #[test]
    fn eviction_close_failure_is_suppressed_but_counted() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(
            PoolConfig::new(factory)
                .with_max_cap(1)
                .with_idle_timeout(Duration::from_millis(5))
                .with_closer(|_| Err("socket already gone".into())),
        )
        .unwrap();

        let conn = pool.acquire().unwrap();
        pool.release(Some(conn)).unwrap();
        thread::sleep(Duration::from_millis(15));

        // The bad close must not block resource delivery.
        assert!(pool.acquire().is_ok());

        let stats = pool.stats();
        assert_eq!(stats.stale_evictions, 1);
        assert_eq!(stats.eviction_close_failures, 1);
    }

    #[test]
    fn acquire_after_shutdown_fails_closed() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(PoolConfig::new(factory)).unwrap();

        pool.shutdown();

        assert!(pool.is_closed());
        assert!(matches!(pool.acquire(), Err(PoolError::Closed)));
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn release_after_shutdown_closes_exactly_once() {
        let (factory, _) = counting_factory();
        let (closer, closed) = recording_closer();
        let pool = Pool::new(PoolConfig::new(factory).with_closer(closer)).unwrap();

        let conn = pool.acquire().unwrap();
        let id = conn.id;
        pool.shutdown();

        pool.release(Some(conn)).unwrap();

        assert_eq!(*closed.lock(), vec![id]);
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn shutdown_drains_each_buffered_resource_once() {
        let (factory, _) = counting_factory();
        let (closer, closed) = recording_closer();
        let pool = Pool::new(PoolConfig::new(factory).with_max_cap(8).with_closer(closer)).unwrap();

        let conns: Vec<_> = (0..5).map(|_| pool.acquire().unwrap()).collect();
        for conn in conns {
            pool.release(Some(conn)).unwrap();
        }
        assert_eq!(pool.size(), 5);

        pool.shutdown();

        let mut drained = closed.lock().clone();
        drained.sort_unstable();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (factory, _) = counting_factory();
        let (closer, closed) = recording_closer();
        let pool = Pool::new(PoolConfig::new(factory).with_closer(closer)).unwrap();

        let conn = pool.acquire().unwrap();
        pool.release(Some(conn)).unwrap();

        pool.shutdown();
        pool.shutdown();

        assert_eq!(closed.lock().len(), 1);
    }

    #[test]
    fn nil_release_and_close_are_rejected_without_collaborator_calls() {
        let closes = Arc::new(AtomicUsize::new(0));
        let closes_seen = Arc::clone(&closes);
        let (factory, created) = counting_factory();
        let pool = Pool::new(PoolConfig::new(factory).with_closer(move |_| {
            closes_seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

        assert!(matches!(pool.release(None), Err(PoolError::NilResource)));
        assert!(matches!(pool.close(None), Err(PoolError::NilResource)));
        assert_eq!(created.load(Ordering::SeqCst), 0);
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn factory_error_propagates_verbatim() {
        let pool: Pool<Conn> =
            Pool::new(PoolConfig::new(|| Err("dial tcp: connection refused".into()))).unwrap();

        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, PoolError::Factory(_)));
        assert_eq!(err.to_string(), "dial tcp: connection refused");
    }

    #[test]
    fn overflow_close_error_propagates() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(
            PoolConfig::new(factory)
                .with_max_cap(1)
                .with_closer(|_| Err("close failed".into())),
        )
        .unwrap();

        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        pool.release(Some(first)).unwrap();

        let err = pool.release(Some(second)).unwrap_err();
        assert!(matches!(err, PoolError::Closer(_)));
    }

    #[test]
    fn close_without_closer_is_a_noop() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(PoolConfig::new(factory)).unwrap();

        let conn = pool.acquire().unwrap();
        pool.close(Some(conn)).unwrap();
    }

    #[test]
    fn zero_max_cap_defaults_to_ten() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(PoolConfig::new(factory).with_max_cap(0).with_initial_cap(64)).unwrap();

        // Pre-fill is capped at the normalized capacity.
        assert_eq!(pool.size(), DEFAULT_MAX_CAP);
    }

    #[test]
    fn prefill_creates_resources_and_first_acquire_hits() {
        let (factory, created) = counting_factory();
        let pool = Pool::new(PoolConfig::new(factory).with_max_cap(5).with_initial_cap(3)).unwrap();

        assert_eq!(pool.size(), 3);
        assert_eq!(created.load(Ordering::SeqCst), 3);

        let _conn = pool.acquire().unwrap();
        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn prefill_factory_error_closes_partial_fill() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_seen = Arc::clone(&attempts);
        let factory = move || {
            let n = attempts_seen.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Ok(Conn { id: n })
            } else {
                Err("factory exhausted".into())
            }
        };
        let (closer, closed) = recording_closer();

        let result = Pool::new(PoolConfig::new(factory).with_initial_cap(4).with_closer(closer));

        assert!(matches!(result, Err(PoolError::Factory(_))));
        assert_eq!(closed.lock().len(), 2);
    }

    #[test]
    fn clones_share_state() {
        let (factory, _) = counting_factory();
        let pool = Pool::new(PoolConfig::new(factory).with_max_cap(1)).unwrap();
        let handle = pool.clone();

        let conn = pool.acquire().unwrap();
        handle.release(Some(conn)).unwrap();
        assert_eq!(pool.size(), 1);

        handle.shutdown();
        assert!(matches!(pool.acquire(), Err(PoolError::Closed)));
    }
}
