//! Proxy counters.
//!
//! Updated with relaxed atomics on the request path; read as a consistent
//! enough [`StatsSnapshot`] for logging and CLI output.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between the proxy and its background writes.
#[derive(Debug, Default)]
pub struct ProxyStats {
    hits: AtomicU64,
    misses: AtomicU64,
    pass_through: AtomicU64,
    stored: AtomicU64,
    evicted: AtomicU64,
    lookup_failures: AtomicU64,
    store_failures: AtomicU64,
    network_errors: AtomicU64,
}

impl ProxyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pass_through(&self) {
        self.pass_through.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stored(&self, evicted: usize) {
        self.stored.fetch_add(1, Ordering::Relaxed);
        self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub fn record_lookup_failure(&self) {
        self.lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_error(&self) {
        self.network_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            pass_through: self.pass_through.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ProxyStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub pass_through: u64,
    pub stored: u64,
    pub evicted: u64,
    pub lookup_failures: u64,
    pub store_failures: u64,
    pub network_errors: u64,
}

impl StatsSnapshot {
    /// Fraction of cacheable requests served from cache, 0.0 when none.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits, {} misses ({:.1}% hit rate), {} passed through, {} stored, {} evicted",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.pass_through,
            self.stored,
            self.evicted
        )?;
        if self.store_failures + self.lookup_failures + self.network_errors > 0 {
            write!(
                f,
                "; {} lookup failures, {} store failures, {} network errors",
                self.lookup_failures, self.store_failures, self.network_errors
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = ProxyStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_pass_through();
        stats.record_stored(1);
        stats.record_store_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.pass_through, 1);
        assert_eq!(snap.stored, 1);
        assert_eq!(snap.evicted, 1);
        assert_eq!(snap.store_failures, 1);
    }

    #[test]
    fn test_hit_rate() {
        assert_eq!(StatsSnapshot::default().hit_rate(), 0.0);

        let snap = StatsSnapshot {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((snap.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display_omits_zero_failures() {
        let snap = StatsSnapshot {
            hits: 1,
            misses: 1,
            ..Default::default()
        };
        let text = snap.to_string();
        assert!(text.contains("50.0% hit rate"));
        assert!(!text.contains("failures"));

        let snap = StatsSnapshot {
            network_errors: 2,
            ..Default::default()
        };
        assert!(snap.to_string().contains("2 network errors"));
    }
}
