use super::error::BufferError;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoragePressure {
    None,
    Warning,
    Critical,
}

/// Byte budget of a single partition. Reservations fail instead of overshooting.
#[derive(Debug)]
pub struct ByteBudget {
    partition: usize,
    max_bytes: u64,
    current_usage: AtomicU64,
}

impl ByteBudget {
    const WARNING_THRESHOLD: f64 = 0.8;
    const CRITICAL_THRESHOLD: f64 = 0.95;

    pub fn new(partition: usize, max_bytes: u64) -> Self {
        Self {
            partition,
            max_bytes,
            current_usage: AtomicU64::new(0),
        }
    }

    pub fn reserve(&self, size: u64) -> Result<(), BufferError> {
        self.current_usage
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let next = current.saturating_add(size);
                (next <= self.max_bytes).then_some(next)
            })
            .map(|_| ())
            .map_err(|current| BufferError::CapacityExceeded {
                partition: self.partition,
                details: format!(
                    "bound of {} bytes reached ({current} in use, {size} requested)",
                    self.max_bytes
                ),
            })
    }

    pub fn release(&self, size: u64) {
        let _ = self
            .current_usage
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(size))
            });
    }

    /// Sets usage to an externally measured value (e.g. after reopening storage).
    pub fn set(&self, usage: u64) {
        self.current_usage.store(usage, Ordering::Release);
    }

    pub fn used(&self) -> u64 {
        self.current_usage.load(Ordering::Relaxed)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn usage_ratio(&self) -> f64 {
        self.used() as f64 / self.max_bytes as f64
    }

    pub fn pressure(&self) -> StoragePressure {
        let ratio = self.usage_ratio();
        if ratio >= Self::CRITICAL_THRESHOLD {
            StoragePressure::Critical
        } else if ratio >= Self::WARNING_THRESHOLD {
            StoragePressure::Warning
        } else {
            StoragePressure::None
        }
    }
}
