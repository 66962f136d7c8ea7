//! Runtime counters for scans and the asset cache.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::types::now_secs;

const SCAN_SAMPLE_CAPACITY: usize = 120;

/// Fixed-capacity ring of recent duration samples, milliseconds.
#[derive(Debug)]
struct SampleRing {
    samples: Vec<f32>,
    cursor: usize,
    capacity: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self { samples: Vec::with_capacity(capacity), cursor: 0, capacity }
    }

    fn record(&mut self, value: f32) {
        if self.samples.len() < self.capacity {
            self.samples.push(value);
        } else {
            self.samples[self.cursor] = value;
            self.cursor = (self.cursor + 1) % self.capacity;
        }
    }

    fn percentile(&self, fraction: f32) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let rank = (fraction.clamp(0.0, 1.0) * (sorted.len() - 1) as f32).round() as usize;
        sorted[rank]
    }
}

#[derive(Debug)]
struct Counters {
    started_at: Instant,
    scan_times_ms: SampleRing,
    scans_completed: u64,
    scans_failed: u64,
    cache_requests: u64,
    cache_hits: u64,
    cache_bytes_used: u64,
    cache_entries: u64,
}

/// Thread-safe counter collection shared by the scanner and asset cache.
#[derive(Debug)]
pub struct StatsCollector {
    inner: parking_lot::Mutex<Counters>,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            inner: parking_lot::Mutex::new(Counters {
                started_at: Instant::now(),
                scan_times_ms: SampleRing::new(SCAN_SAMPLE_CAPACITY),
                scans_completed: 0,
                scans_failed: 0,
                cache_requests: 0,
                cache_hits: 0,
                cache_bytes_used: 0,
                cache_entries: 0,
            }),
        }
    }

    /// Record a finished scan and how long it took.
    pub fn record_scan(&self, duration: Duration, succeeded: bool) {
        let mut counters = self.inner.lock();
        counters.scan_times_ms.record(duration.as_secs_f64() as f32 * 1_000.0);
        let slot = if succeeded {
            &mut counters.scans_completed
        } else {
            &mut counters.scans_failed
        };
        *slot = slot.saturating_add(1);
    }

    /// Record whether a cache lookup produced a hit.
    pub fn record_cache_lookup(&self, hit: bool) {
        let mut counters = self.inner.lock();
        counters.cache_requests = counters.cache_requests.saturating_add(1);
        if hit {
            counters.cache_hits = counters.cache_hits.saturating_add(1);
        }
    }

    /// Refresh the aggregate cache usage counters.
    pub fn update_cache_usage(&self, used_bytes: u64, entries: u64) {
        let mut counters = self.inner.lock();
        counters.cache_bytes_used = used_bytes;
        counters.cache_entries = entries;
    }

    /// Snapshot the current metrics for presentation.
    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.inner.lock();

        StatsSnapshot {
            timestamp: now_secs(),
            uptime_ms: counters.started_at.elapsed().as_millis() as u64,
            scans_completed: counters.scans_completed,
            scans_failed: counters.scans_failed,
            scan_time_ms_p50: counters.scan_times_ms.percentile(0.50),
            scan_time_ms_p95: counters.scan_times_ms.percentile(0.95),
            cache_requests: counters.cache_requests,
            cache_hit_ratio: counters.cache_hits as f32 / counters.cache_requests.max(1) as f32,
            cache_bytes_used: counters.cache_bytes_used,
            cache_entries: counters.cache_entries,
        }
    }
}

/// Immutable snapshot handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub timestamp: u64,
    pub uptime_ms: u64,
    pub scans_completed: u64,
    pub scans_failed: u64,
    pub scan_time_ms_p50: f32,
    pub scan_time_ms_p95: f32,
    pub cache_requests: u64,
    pub cache_hit_ratio: f32,
    pub cache_bytes_used: u64,
    pub cache_entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_counters_accumulate() {
        let stats = StatsCollector::new();
        stats.record_scan(Duration::from_millis(20), true);
        stats.record_scan(Duration::from_millis(40), false);

        let snap = stats.snapshot();
        assert_eq!(snap.scans_completed, 1);
        assert_eq!(snap.scans_failed, 1);
        assert!(snap.scan_time_ms_p50 >= 20.0);
        assert!(snap.scan_time_ms_p95 <= 41.0);
    }

    #[test]
    fn cache_hit_ratio_is_tracked() {
        let stats = StatsCollector::new();
        stats.record_cache_lookup(true);
        stats.record_cache_lookup(false);
        stats.update_cache_usage(2_048, 3);

        let snap = stats.snapshot();
        assert_eq!(snap.cache_requests, 2);
        assert!(snap.cache_hit_ratio > 0.4 && snap.cache_hit_ratio < 0.6);
        assert_eq!(snap.cache_bytes_used, 2_048);
        assert_eq!(snap.cache_entries, 3);
    }

    #[test]
    fn sample_ring_wraps_without_growing() {
        let mut ring = SampleRing::new(4);
        for value in 0..10 {
            ring.record(value as f32);
        }
        assert_eq!(ring.samples.len(), 4);
        // Only the newest capacity-many samples influence percentiles.
        assert!(ring.percentile(0.0) >= 4.0);
    }
}
