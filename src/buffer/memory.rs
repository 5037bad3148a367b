use super::budget::{ByteBudget, StoragePressure};
use super::error::BufferError;
use super::partition::{PartitionStore, TimeSpan};
use crate::domain::{FeedData, Fields, Record};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type Series = Arc<RwLock<BTreeMap<i64, Fields>>>;

/// Memory-backed partition bounded by an estimated byte budget.
pub struct MemoryPartition {
    index: usize,
    series: RwLock<HashMap<String, Series>>,
    budget: ByteBudget,
    closed: AtomicBool,
}

impl MemoryPartition {
    pub fn new(index: usize, max_bytes: u64) -> Self {
        Self {
            index,
            series: RwLock::new(HashMap::new()),
            budget: ByteBudget::new(index, max_bytes),
            closed: AtomicBool::new(false),
        }
    }

    pub fn pressure(&self) -> StoragePressure {
        self.budget.pressure()
    }

    fn series_for(&self, feed_id: &str) -> Series {
        if let Some(series) = self.series.read().get(feed_id) {
            return series.clone();
        }
        self.series
            .write()
            .entry(feed_id.to_string())
            .or_default()
            .clone()
    }
}

impl PartitionStore for MemoryPartition {
    fn index(&self) -> usize {
        self.index
    }

    fn put(&self, feed_id: &str, timestamp: i64, fields: &Fields) -> Result<(), BufferError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BufferError::Closed {
                partition: self.index,
            });
        }

        let size = Record::estimated_size(feed_id, fields) as u64;
        self.budget.reserve(size)?;

        let series = self.series_for(feed_id);
        let replaced = series.write().insert(timestamp, fields.clone());
        if let Some(old) = replaced {
            self.budget
                .release(Record::estimated_size(feed_id, &old) as u64);
        }
        Ok(())
    }

    fn get(&self, feed_ids: &[String], start: i64, end: i64) -> Result<FeedData, BufferError> {
        let mut result = FeedData::new();
        if start > end {
            return Ok(result);
        }
        for feed_id in feed_ids {
            let Some(series) = self.series.read().get(feed_id).cloned() else {
                continue;
            };
            let records: Vec<Record> = series
                .read()
                .range(start..=end)
                .map(|(ts, fields)| Record::new(feed_id.clone(), *ts, fields.clone()))
                .collect();
            if !records.is_empty() {
                result.insert(feed_id.clone(), records);
            }
        }
        Ok(result)
    }

    fn is_fully_within_time_span(&self, feed_id: &str, start: i64) -> bool {
        self.series
            .read()
            .get(feed_id)
            .and_then(|series| series.read().first_key_value().map(|(ts, _)| *ts))
            .is_some_and(|earliest| earliest <= start)
    }

    fn feed_bounds(&self) -> Result<HashMap<String, TimeSpan>, BufferError> {
        let series = self.series.read();
        Ok(series
            .iter()
            .filter_map(|(feed_id, series)| {
                let series = series.read();
                let (min, _) = series.first_key_value()?;
                let (max, _) = series.last_key_value()?;
                Some((feed_id.clone(), TimeSpan { min: *min, max: *max }))
            })
            .collect())
    }

    fn usage_bytes(&self) -> u64 {
        self.budget.used()
    }

    fn reset(&self) -> Result<(), BufferError> {
        self.series.write().clear();
        self.budget.set(0);
        self.closed.store(false, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> Result<(), BufferError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPartition")
            .field("index", &self.index)
            .field("feeds", &self.series.read().len())
            .field("usage", &self.budget.used())
            .field("max_bytes", &self.budget.max_bytes())
            .finish()
    }
}
