//! Provider capabilities shared by the buffer rings, external archives and the
//! display layer.
//!
//! Every timestamp crossing these traits is qualified by a `TimeUnit`; returned
//! records are expressed in the unit of the request.

use crate::buffer::BufferError;
use crate::domain::{CompletionCallback, FeedBatch, FeedData, Fields, LevelOfService, TimeUnit};
use std::collections::BTreeMap;

/// Read capability of a data source.
pub trait DataProvider: Send + Sync {
    /// Human-readable identifier used in logs.
    fn name(&self) -> String;

    fn level_of_service(&self) -> LevelOfService;

    /// Records of `feed_ids` with `start <= timestamp <= end`, ascending per feed.
    /// A feed without data is absent from the result.
    fn get_data(
        &self,
        feed_ids: &[String],
        unit: TimeUnit,
        start: i64,
        end: i64,
    ) -> Result<FeedData, BufferError>;

    /// True when this provider alone can answer queries for `feed_id` that start at
    /// or after `start`.
    fn is_fully_within_time_span(&self, feed_id: &str, unit: TimeUnit, start: i64) -> bool;
}

/// A provider that also accepts writes.
pub trait DataArchive: DataProvider {
    fn put_data(
        &self,
        feed_id: &str,
        unit: TimeUnit,
        timestamp: i64,
        fields: &Fields,
    ) -> Result<(), BufferError>;

    fn put_bulk(
        &self,
        feed_id: &str,
        unit: TimeUnit,
        entries: &BTreeMap<i64, Fields>,
    ) -> Result<(), BufferError>;

    /// Multi-feed write; `on_complete` runs exactly once after every entry has been
    /// attempted.
    fn put_batch(
        &self,
        batch: &FeedBatch,
        unit: TimeUnit,
        on_complete: CompletionCallback,
    ) -> Result<(), BufferError>;

    fn reset(&self) -> Result<(), BufferError>;

    fn close(&self) -> Result<(), BufferError>;
}
