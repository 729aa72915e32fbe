//! Load telemetry

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time copy of the store counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    /// Every `load_index`/`load_period` call
    pub requests: u64,
    /// Served from cache
    pub hits: u64,
    /// Started a new fetch
    pub misses: u64,
    /// Joined a fetch already in flight
    pub coalesced: u64,
    /// Underlying source fetches completed
    pub fetches: u64,
    /// Fetches that ended in an error
    pub failures: u64,
    /// Fetches slower than the configured threshold
    pub slow_loads: u64,
    #[serde(with = "duration_ms")]
    pub total_load_time: Duration,
}

impl LoadStats {
    /// Mean fetch latency, zero before the first fetch
    pub fn average_load_time(&self) -> Duration {
        let mean = self
            .total_load_time
            .as_nanos()
            .checked_div(u128::from(self.fetches))
            .unwrap_or(0);
        Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX))
    }

    pub fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }
}

/// Live counters shared by the store and its fetch tasks
#[derive(Debug, Default)]
pub(crate) struct Telemetry {
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    fetches: AtomicU64,
    failures: AtomicU64,
    slow_loads: AtomicU64,
    load_nanos: AtomicU64,
}

impl Telemetry {
    pub fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one finished fetch; returns true if it counted as slow
    pub fn fetched(&self, elapsed: Duration, ok: bool, slow_threshold: Duration) -> bool {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.load_nanos.fetch_add(nanos, Ordering::Relaxed);

        let slow = elapsed > slow_threshold;
        if slow {
            self.slow_loads.fetch_add(1, Ordering::Relaxed);
        }
        slow
    }

    pub fn snapshot(&self) -> LoadStats {
        LoadStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            slow_loads: self.slow_loads.load(Ordering::Relaxed),
            total_load_time: Duration::from_nanos(self.load_nanos.load(Ordering::Relaxed)),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.requests,
            &self.hits,
            &self.misses,
            &self.coalesced,
            &self.fetches,
            &self.failures,
            &self.slow_loads,
            &self.load_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetched_tracks_failures_and_slow_loads() {
        let t = Telemetry::default();
        let threshold = Duration::from_millis(100);

        assert!(!t.fetched(Duration::from_millis(20), true, threshold));
        assert!(t.fetched(Duration::from_millis(180), false, threshold));

        let stats = t.snapshot();
        assert_eq!(stats.fetches, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.slow_loads, 1);
        assert_eq!(stats.average_load_time(), Duration::from_millis(100));
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let t = Telemetry::default();
        t.request();
        t.hit();
        t.fetched(Duration::from_millis(5), true, Duration::from_secs(1));
        t.reset();
        assert_eq!(t.snapshot(), LoadStats::default());
    }

    #[test]
    fn test_empty_stats() {
        let stats = LoadStats::default();
        assert_eq!(stats.average_load_time(), Duration::ZERO);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_average_with_huge_fetch_count() {
        let stats = LoadStats {
            fetches: 1 << 32,
            total_load_time: Duration::from_secs(1 << 32),
            ..Default::default()
        };
        assert_eq!(stats.average_load_time(), Duration::from_secs(1));
    }
}
