//! Pool configuration options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::BoxedError;

/// Maximum idle capacity used when the configured one is zero.
pub const DEFAULT_MAX_CAP: usize = 10;

/// Creates a fresh resource. Must be safe to call from any thread.
pub type Factory<T> = Arc<dyn Fn() -> Result<T, BoxedError> + Send + Sync>;

/// Releases a resource for good. Must be safe to call from any thread and
/// must not re-enter the pool.
pub type Closer<T> = Arc<dyn Fn(T) -> Result<(), BoxedError> + Send + Sync>;

/// Configuration for a [`Pool`](crate::Pool), captured at construction.
///
/// # Examples
///
/// ```
/// use idlepool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new(|| Ok(String::from("conn")))
///     .with_max_cap(32)
///     .with_idle_timeout(Duration::from_secs(15));
///
/// assert_eq!(config.max_cap, 32);
/// assert_eq!(config.idle_timeout, Some(Duration::from_secs(15)));
/// ```
pub struct PoolConfig<T> {
    /// Maximum number of idle resources kept in the pool. Zero means
    /// [`DEFAULT_MAX_CAP`].
    pub max_cap: usize,

    /// Number of resources created up front. Defaults to zero (off); capped
    /// at `max_cap`.
    pub initial_cap: usize,

    /// Maximum time a resource may sit idle before acquisition discards it.
    /// `None` disables staleness eviction.
    pub idle_timeout: Option<Duration>,

    pub(crate) factory: Factory<T>,
    pub(crate) closer: Option<Closer<T>>,
}

impl<T> PoolConfig<T> {
    /// Create a configuration around the required factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<T, BoxedError> + Send + Sync + 'static,
    {
        Self {
            max_cap: DEFAULT_MAX_CAP,
            initial_cap: 0,
            idle_timeout: None,
            factory: Arc::new(factory),
            closer: None,
        }
    }

    /// Set the maximum idle capacity. Zero falls back to
    /// [`DEFAULT_MAX_CAP`] at construction.
    pub fn with_max_cap(mut self, max_cap: usize) -> Self {
        self.max_cap = max_cap;
        self
    }

    /// Pre-fill the pool with `initial_cap` resources at construction.
    ///
    /// ```
    /// use idlepool::{Pool, PoolConfig};
    ///
    /// let pool = Pool::new(PoolConfig::new(|| Ok(0u8)).with_initial_cap(3)).unwrap();
    /// assert_eq!(pool.size(), 3);
    /// ```
    pub fn with_initial_cap(mut self, initial_cap: usize) -> Self {
        self.initial_cap = initial_cap;
        self
    }

    /// Discard idle resources older than `timeout` at acquisition time.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Set the closer invoked on eviction, overflow, and shutdown. Without
    /// one, discarded resources are simply dropped.
    pub fn with_closer<C>(mut self, closer: C) -> Self
    where
        C: Fn(T) -> Result<(), BoxedError> + Send + Sync + 'static,
    {
        self.closer = Some(Arc::new(closer));
        self
    }
}

impl<T> fmt::Debug for PoolConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("max_cap", &self.max_cap)
            .field("initial_cap", &self.initial_cap)
            .field("idle_timeout", &self.idle_timeout)
            .field("closer", &self.closer.is_some())
            .finish_non_exhaustive()
    }
}
