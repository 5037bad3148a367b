use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct RingMetrics {
    pub records_written: u64,
    pub records_rejected: u64,
    pub rotations: u64,
    pub rotation_failures: u64,
    pub queries: u64,
    pub uptime_secs: f64,
    pub write_rate_per_second: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionStats {
    pub index: usize,
    pub feeds: usize,
    pub usage_bytes: u64,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RingStats {
    pub current_index: usize,
    pub partitions: Vec<PartitionStats>,
    /// Retired partitions still readable inside the overlap window.
    pub draining_partitions: usize,
    pub metrics: RingMetrics,
}

pub struct RingMetricsCollector {
    records_written: AtomicU64,
    records_rejected: AtomicU64,
    rotations: AtomicU64,
    rotation_failures: AtomicU64,
    queries: AtomicU64,
    start_time: Instant,
}

impl RingMetricsCollector {
    pub fn new() -> Self {
        Self {
            records_written: AtomicU64::new(0),
            records_rejected: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            rotation_failures: AtomicU64::new(0),
            queries: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_written(&self, count: u64) {
        self.records_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation_failure(&self) {
        self.rotation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RingMetrics {
        let records_written = self.records_written.load(Ordering::Relaxed);
        let uptime_secs = self.start_time.elapsed().as_secs_f64();
        let write_rate_per_second = if uptime_secs > 0.0 {
            records_written as f64 / uptime_secs
        } else {
            0.0
        };

        RingMetrics {
            records_written,
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            rotation_failures: self.rotation_failures.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            uptime_secs,
            write_rate_per_second,
        }
    }

    pub fn reset(&self) {
        self.records_written.store(0, Ordering::Relaxed);
        self.records_rejected.store(0, Ordering::Relaxed);
        self.rotations.store(0, Ordering::Relaxed);
        self.rotation_failures.store(0, Ordering::Relaxed);
        self.queries.store(0, Ordering::Relaxed);
    }
}

impl Default for RingMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RingMetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingMetricsCollector")
            .field("records_written", &self.records_written.load(Ordering::Relaxed))
            .field("rotations", &self.rotations.load(Ordering::Relaxed))
            .finish()
    }
}
