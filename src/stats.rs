//! Statistics and diagnostics types.

#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one map (all zero when the `metrics` feature is disabled).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ops {
    /// Keys inserted into an empty or tombstoned slot.
    pub inserts: u64,
    /// Values replaced on a live key.
    pub updates: u64,
    /// Live keys deleted.
    pub removes: u64,
    /// Compare-and-swap attempts that lost a race and were retried.
    pub cas_retries: u64,
    /// Sweep unlinks that lost a race and restarted the walk.
    pub unlink_misses: u64,
}

/// Thread-safe operation counters for a single map.
#[cfg(feature = "metrics")]
pub(crate) struct MapStats {
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
    cas_retries: AtomicU64,
    unlink_misses: AtomicU64,
}

#[cfg(feature = "metrics")]
impl MapStats {
    pub fn new() -> Self {
        Self {
            inserts: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            removes: AtomicU64::new(0),
            cas_retries: AtomicU64::new(0),
            unlink_misses: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cas_retry(&self) {
        self.cas_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unlink_miss(&self) {
        self.unlink_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Ops {
        Ops {
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            cas_retries: self.cas_retries.load(Ordering::Relaxed),
            unlink_misses: self.unlink_misses.load(Ordering::Relaxed),
        }
    }
}

/// Zero-sized placeholder when metrics are disabled.
#[cfg(not(feature = "metrics"))]
pub(crate) struct MapStats;

#[cfg(not(feature = "metrics"))]
impl MapStats {
    pub fn new() -> Self {
        MapStats
    }

    #[inline]
    pub fn record_insert(&self) {}

    #[inline]
    pub fn record_update(&self) {}

    #[inline]
    pub fn record_remove(&self) {}

    #[inline]
    pub fn record_cas_retry(&self) {}

    #[inline]
    pub fn record_unlink_miss(&self) {}

    pub fn snapshot(&self) -> Ops {
        Ops::default()
    }
}

impl Default for MapStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural snapshot of a map.
///
/// For the concurrent map every field is gathered with atomic loads while
/// other threads may be mutating, so the numbers need not agree with each other.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// Number of live keys (the map's `len()`).
    pub size: usize,
    /// Number of buckets.
    pub capacity: usize,
    /// Buckets with at least one reachable node.
    pub occupied_buckets: usize,
    /// Reachable nodes in the longest chain, tombstones included.
    pub longest_chain: usize,
    /// Reachable nodes whose value is marked deleted. Always 0 for the sequential map.
    pub tombstones: usize,
    /// Operation counters.
    pub operations: Ops,
}

impl Stats {
    /// Live keys per bucket.
    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.size as f64 / self.capacity as f64
        }
    }

    /// Fold one chain's shape into the snapshot.
    pub(crate) fn add_chain(&mut self, nodes: usize, tombstones: usize) {
        if nodes > 0 {
            self.occupied_buckets += 1;
        }
        self.longest_chain = self.longest_chain.max(nodes);
        self.tombstones += tombstones;
    }
}
