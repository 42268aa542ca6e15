//! Call Statistics Module
//!
//! Process-local hit and miss counters for one cached wrapper.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Call Stats ==
/// Lock-free counters updated on every cached call.
#[derive(Debug, Default)]
pub struct CallStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CallStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Takes a snapshot, attaching the store-side entry count.
    pub fn snapshot(&self, currsize: Option<usize>) -> CacheInfo {
        CacheInfo {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            currsize,
        }
    }
}

// == Cache Info ==
/// Snapshot returned by `Cached::cache_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    /// Calls answered from the store
    pub hits: u64,
    /// Calls that invoked the wrapped callable
    pub misses: u64,
    /// Keys currently stored under the prefix, `None` if the store could not be scanned
    pub currsize: Option<usize>,
}

impl CacheInfo {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no calls have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
