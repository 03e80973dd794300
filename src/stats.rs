//! Hit/miss accounting and stats export for pools

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a pool's counters.
///
/// Counters are read with relaxed atomic loads and `total_idle` is a
/// point-in-time buffer length, so a snapshot taken under concurrent
/// traffic is best-effort, not transactionally consistent.
///
/// # Examples
///
/// ```
/// use idlepool::{Pool, PoolConfig};
///
/// let pool = Pool::new(PoolConfig::new(|| Ok(0u8))).unwrap();
/// let resource = pool.acquire().unwrap();
/// pool.release(Some(resource)).unwrap();
///
/// let stats = pool.stats();
/// assert_eq!(stats.misses, 1);
/// assert_eq!(stats.total_idle, 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolStats {
    /// Acquisitions served from the idle buffer.
    pub hits: u64,

    /// Acquisitions that had to create a new resource.
    pub misses: u64,

    /// Idle resources currently buffered.
    pub total_idle: usize,

    /// Stale idle resources discarded during acquisition.
    pub stale_evictions: u64,

    /// Closer failures while discarding stale resources. Those errors are
    /// suppressed on the acquire path and only surface here.
    pub eviction_close_failures: u64,
}

impl PoolStats {
    /// Export the snapshot as string key/value pairs.
    pub fn export(&self) -> HashMap<String, String> {
        let mut stats = HashMap::new();
        stats.insert("hits".to_string(), self.hits.to_string());
        stats.insert("misses".to_string(), self.misses.to_string());
        stats.insert("total_idle".to_string(), self.total_idle.to_string());
        stats.insert("stale_evictions".to_string(), self.stale_evictions.to_string());
        stats.insert(
            "eviction_close_failures".to_string(),
            self.eviction_close_failures.to_string(),
        );
        stats
    }
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits: {}\tmisses: {}\ttotal_idle: {}\tstale_evictions: {}\teviction_close_failures: {}",
            self.hits, self.misses, self.total_idle, self.stale_evictions, self.eviction_close_failures
        )
    }
}

/// Renders [`PoolStats`] in Prometheus exposition format.
pub struct StatsExporter;

impl StatsExporter {
    /// Export a snapshot in Prometheus exposition format.
    ///
    /// # Examples
    ///
    /// ```
    /// use idlepool::{Pool, PoolConfig, StatsExporter};
    /// use std::collections::HashMap;
    ///
    /// let pool = Pool::new(PoolConfig::new(|| Ok(0u8))).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = StatsExporter::export_prometheus(&pool.stats(), "backend", Some(&tags));
    /// assert!(output.contains("idlepool_hits_total"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        stats: &PoolStats,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        output.push_str("# HELP idlepool_idle Idle resources currently buffered\n");
        output.push_str("# TYPE idlepool_idle gauge\n");
        output.push_str(&format!("idlepool_idle{{{}}} {}\n", labels, stats.total_idle));

        output.push_str("# HELP idlepool_hits_total Acquisitions served from the idle buffer\n");
        output.push_str("# TYPE idlepool_hits_total counter\n");
        output.push_str(&format!("idlepool_hits_total{{{}}} {}\n", labels, stats.hits));

        output.push_str("# HELP idlepool_misses_total Acquisitions that created a new resource\n");
        output.push_str("# TYPE idlepool_misses_total counter\n");
        output.push_str(&format!("idlepool_misses_total{{{}}} {}\n", labels, stats.misses));

        output.push_str("# HELP idlepool_stale_evictions_total Stale idle resources discarded\n");
        output.push_str("# TYPE idlepool_stale_evictions_total counter\n");
        output.push_str(&format!(
            "idlepool_stale_evictions_total{{{}}} {}\n",
            labels, stats.stale_evictions
        ));

        output.push_str("# HELP idlepool_eviction_close_failures_total Closer failures during stale eviction\n");
        output.push_str("# TYPE idlepool_eviction_close_failures_total counter\n");
        output.push_str(&format!(
            "idlepool_eviction_close_failures_total{{{}}} {}\n",
            labels, stats.eviction_close_failures
        ));

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal counter set, updated with relaxed atomics on the hot path.
#[derive(Default)]
pub(crate) struct StatsTracker {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub stale_evictions: AtomicU64,
    pub eviction_close_failures: AtomicU64,
}

impl StatsTracker {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_eviction(&self, close_failed: bool) {
        self.stale_evictions.fetch_add(1, Ordering::Relaxed);
        if close_failed {
            self.eviction_close_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, total_idle: usize) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            total_idle,
            stale_evictions: self.stale_evictions.load(Ordering::Relaxed),
            eviction_close_failures: self.eviction_close_failures.load(Ordering::Relaxed),
        }
    }
}
