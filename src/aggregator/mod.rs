//! Fan-out of writes and fan-in of reads across every registered provider.
//!
//! Archives (writable providers, the buffer rings among them) receive every
//! write; all providers, archives included, answer reads. Sources are kept in
//! level-of-service order so the fastest one is consulted first on reads.

mod merge;

use crate::buffer::{BufferError, validate_record};
use crate::domain::{CompletionCallback, FeedBatch, FeedData, Fields, LevelOfService, TimeUnit};
use crate::port::{DataArchive, DataProvider};
use merge::FeedMerger;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
enum Source {
    Archive(Arc<dyn DataArchive>),
    External(Arc<dyn DataProvider>),
}

impl Source {
    fn name(&self) -> String {
        match self {
            Source::Archive(archive) => archive.name(),
            Source::External(provider) => provider.name(),
        }
    }

    fn level_of_service(&self) -> LevelOfService {
        match self {
            Source::Archive(archive) => archive.level_of_service(),
            Source::External(provider) => provider.level_of_service(),
        }
    }

    fn get_data(
        &self,
        feed_ids: &[String],
        unit: TimeUnit,
        start: i64,
        end: i64,
    ) -> Result<FeedData, BufferError> {
        match self {
            Source::Archive(archive) => archive.get_data(feed_ids, unit, start, end),
            Source::External(provider) => provider.get_data(feed_ids, unit, start, end),
        }
    }

    fn is_fully_within_time_span(&self, feed_id: &str, unit: TimeUnit, start: i64) -> bool {
        match self {
            Source::Archive(archive) => archive.is_fully_within_time_span(feed_id, unit, start),
            Source::External(provider) => provider.is_fully_within_time_span(feed_id, unit, start),
        }
    }
}

/// Front door of the buffer: ingestion and range queries for a set of feeds.
pub struct FeedAggregator {
    sources: RwLock<Vec<Source>>,
}

impl FeedAggregator {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
        }
    }

    pub fn with_archives(archives: impl IntoIterator<Item = Arc<dyn DataArchive>>) -> Self {
        let aggregator = Self::new();
        for archive in archives {
            aggregator.add_archive(archive);
        }
        aggregator
    }

    /// Registers a writable provider. Re-adding a demoted archive brings it back.
    pub fn add_archive(&self, archive: Arc<dyn DataArchive>) {
        let mut sources = self.sources.write();
        let exists = sources
            .iter()
            .any(|s| matches!(s, Source::Archive(a) if Arc::ptr_eq(a, &archive)));
        if exists {
            return;
        }
        info!(
            "Adding archive {} ({})",
            archive.name(),
            archive.level_of_service()
        );
        insert_ordered(&mut sources, Source::Archive(archive));
    }

    pub fn remove_archive(&self, archive: &Arc<dyn DataArchive>) -> bool {
        let mut sources = self.sources.write();
        let before = sources.len();
        sources.retain(|s| !matches!(s, Source::Archive(a) if Arc::ptr_eq(a, archive)));
        before != sources.len()
    }

    /// Registers a read-only provider.
    pub fn add_provider(&self, provider: Arc<dyn DataProvider>) {
        let mut sources = self.sources.write();
        let exists = sources
            .iter()
            .any(|s| matches!(s, Source::External(p) if Arc::ptr_eq(p, &provider)));
        if exists {
            return;
        }
        info!(
            "Adding provider {} ({})",
            provider.name(),
            provider.level_of_service()
        );
        insert_ordered(&mut sources, Source::External(provider));
    }

    pub fn remove_provider(&self, provider: &Arc<dyn DataProvider>) -> bool {
        let mut sources = self.sources.write();
        let before = sources.len();
        sources.retain(|s| !matches!(s, Source::External(p) if Arc::ptr_eq(p, provider)));
        before != sources.len()
    }

    pub fn archive_count(&self) -> usize {
        self.archives().len()
    }

    pub fn provider_count(&self) -> usize {
        self.sources.read().len()
    }

    pub fn archive_levels(&self) -> Vec<LevelOfService> {
        self.archives()
            .iter()
            .map(|archive| archive.level_of_service())
            .collect()
    }

    /// Writes one record to every active archive.
    ///
    /// Succeeds when at least one archive accepted the record. An archive that
    /// reports `CapacityExceeded` is dropped from the active set.
    pub fn put(
        &self,
        feed_id: &str,
        unit: TimeUnit,
        timestamp: i64,
        fields: &Fields,
    ) -> Result<(), BufferError> {
        if let Err(e) = check_record(feed_id, unit, timestamp, fields) {
            warn!("Dropping record: {}", e);
            return Err(e);
        }
        self.write_all(|archive| archive.put_data(feed_id, unit, timestamp, fields))
    }

    pub fn put_bulk(
        &self,
        feed_id: &str,
        unit: TimeUnit,
        entries: &BTreeMap<i64, Fields>,
    ) -> Result<(), BufferError> {
        if let Err(e) = entries
            .iter()
            .try_for_each(|(ts, fields)| check_record(feed_id, unit, *ts, fields))
        {
            warn!("Dropping bulk write of {} records: {}", entries.len(), e);
            return Err(e);
        }
        self.write_all(|archive| archive.put_bulk(feed_id, unit, entries))
    }

    /// Multi-feed write. `on_complete` runs once after every archive was tried.
    pub fn put_batch(
        &self,
        batch: &FeedBatch,
        unit: TimeUnit,
        on_complete: CompletionCallback,
    ) -> Result<(), BufferError> {
        let invalid = batch.iter().find_map(|(feed_id, entries)| {
            entries
                .iter()
                .try_for_each(|(ts, fields)| check_record(feed_id, unit, *ts, fields))
                .err()
        });
        let result = match invalid {
            Some(e) => {
                warn!("Dropping batch of {} feeds: {}", batch.len(), e);
                Err(e)
            }
            None => self.write_all(|archive| archive.put_batch(batch, unit, Box::new(|| {}))),
        };
        on_complete();
        result
    }

    /// Records of `feed_ids` in `[start, end]`, merged across providers.
    pub fn get(&self, feed_ids: &[String], unit: TimeUnit, start: i64, end: i64) -> FeedData {
        let mut merger = FeedMerger::new(start, end);
        if start > end || feed_ids.is_empty() {
            return merger.finish();
        }

        let sources = self.sources.read().clone();
        for source in &sources {
            match source.get_data(feed_ids, unit, start, end) {
                Ok(data) => merger.absorb(data, feed_ids, |feed_id| {
                    source.is_fully_within_time_span(feed_id, unit, start)
                }),
                Err(e) => warn!("Provider {} failed to answer query: {}", source.name(), e),
            }
        }
        merger.finish()
    }

    /// Newest record per feed inside `[start, end]` across all providers.
    pub fn get_latest(
        &self,
        feed_ids: &[String],
        unit: TimeUnit,
        start: i64,
        end: i64,
    ) -> FeedData {
        self.get(feed_ids, unit, start, end)
            .into_iter()
            .filter_map(|(feed_id, records)| {
                let latest = records.into_iter().next_back()?;
                Some((feed_id, vec![latest]))
            })
            .collect()
    }

    fn archives(&self) -> Vec<Arc<dyn DataArchive>> {
        self.sources
            .read()
            .iter()
            .filter_map(|s| match s {
                Source::Archive(archive) => Some(archive.clone()),
                Source::External(_) => None,
            })
            .collect()
    }

    fn write_all(
        &self,
        write: impl Fn(&dyn DataArchive) -> Result<(), BufferError>,
    ) -> Result<(), BufferError> {
        let archives = self.archives();
        let mut accepted = 0usize;
        let mut last_error = None;

        for archive in &archives {
            match write(archive.as_ref()) {
                Ok(()) => accepted += 1,
                Err(e) if e.is_capacity_exceeded() => {
                    error!(
                        "Archive {} is full, removing it from the active set: {}",
                        archive.name(),
                        e
                    );
                    self.remove_archive(archive);
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!("Archive {} rejected write: {}", archive.name(), e);
                    last_error = Some(e);
                }
            }
        }

        if accepted > 0 {
            debug!("Write accepted by {}/{} archives", accepted, archives.len());
            return Ok(());
        }
        match last_error {
            Some(e @ BufferError::MalformedRecord { .. }) => Err(e),
            _ => Err(BufferError::NoWritableArchive),
        }
    }
}

impl Default for FeedAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FeedAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources = self.sources.read();
        f.debug_struct("FeedAggregator")
            .field(
                "sources",
                &sources
                    .iter()
                    .map(|s| format!("{}({})", s.name(), s.level_of_service()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn insert_ordered(sources: &mut Vec<Source>, source: Source) {
    let level = source.level_of_service();
    let at = sources.partition_point(|s| s.level_of_service() <= level);
    sources.insert(at, source);
}

fn check_record(
    feed_id: &str,
    unit: TimeUnit,
    timestamp: i64,
    fields: &Fields,
) -> Result<(), BufferError> {
    validate_record(feed_id, fields)?;
    if unit.to_nanos(timestamp).is_none() {
        return Err(BufferError::malformed(format!(
            "timestamp {timestamp}{unit} of feed '{feed_id}' does not fit in nanoseconds"
        )));
    }
    Ok(())
}
