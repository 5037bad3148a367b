use super::error::BufferError;
use crate::domain::{CompletionCallback, FeedBatch, FeedData, Fields};
use std::collections::{BTreeMap, HashMap};

/// Closed timestamp interval (nanoseconds) covered by one feed in one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub min: i64,
    pub max: i64,
}

impl TimeSpan {
    pub fn point(ts: i64) -> Self {
        Self { min: ts, max: ts }
    }

    pub fn extend(&mut self, ts: i64) {
        self.min = self.min.min(ts);
        self.max = self.max.max(ts);
    }

    pub fn intersects(&self, start: i64, end: i64) -> bool {
        self.min <= end && self.max >= start
    }
}

/// Storage of one rotating segment. Timestamps are nanoseconds.
///
/// Implementations must make a successful write visible to the next read of the
/// same partition, let writes to different feeds proceed in parallel, and
/// serialize writes to one feed.
pub trait PartitionStore: Send + Sync {
    fn index(&self) -> usize;

    fn put(&self, feed_id: &str, timestamp: i64, fields: &Fields) -> Result<(), BufferError>;

    /// Returns the number of applied entries; stops at the first failure.
    fn put_bulk(
        &self,
        feed_id: &str,
        entries: &BTreeMap<i64, Fields>,
    ) -> Result<usize, BufferError> {
        let mut applied = 0;
        for (timestamp, fields) in entries {
            self.put(feed_id, *timestamp, fields)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Applies every feed of `batch`, then calls `on_complete` once. Feeds after a
    /// failure are still attempted; the first error is returned.
    fn put_batch(
        &self,
        batch: &FeedBatch,
        on_complete: CompletionCallback,
    ) -> Result<usize, BufferError> {
        let mut applied = 0;
        let mut first_error = None;
        for (feed_id, entries) in batch {
            match self.put_bulk(feed_id, entries) {
                Ok(n) => applied += n,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        on_complete();
        match first_error {
            Some(e) => Err(e),
            None => Ok(applied),
        }
    }

    /// Records with `start <= ts <= end`, ascending. Feeds without matches are absent.
    fn get(&self, feed_ids: &[String], start: i64, end: i64) -> Result<FeedData, BufferError>;

    /// True iff the earliest retained record of `feed_id` is at or before `start`.
    fn is_fully_within_time_span(&self, feed_id: &str, start: i64) -> bool;

    /// Per-feed span of the retained data.
    fn feed_bounds(&self) -> Result<HashMap<String, TimeSpan>, BufferError>;

    fn usage_bytes(&self) -> u64;

    fn reset(&self) -> Result<(), BufferError>;

    /// Releases storage resources. Idempotent.
    fn close(&self) -> Result<(), BufferError>;
}
