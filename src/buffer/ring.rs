use super::config::RingConfig;
#[cfg(feature = "disk")]
use super::config::ensure_writable_dir;
#[cfg(feature = "disk")]
use super::disk::DiskPartition;
use super::error::BufferError;
use super::memory::MemoryPartition;
use super::metadata::PartitionMetadata;
use super::metrics::{PartitionStats, RingMetricsCollector, RingStats};
use super::partition::PartitionStore;
use crate::domain::{
    CompletionCallback, FeedBatch, FeedData, Fields, LevelOfService, Record, StorageKind,
    TimeUnit,
};
use crate::port::{DataArchive, DataProvider};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
#[cfg(feature = "disk")]
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const RING_STATE_FILE: &str = "ring-state.json";
pub const MAX_FEED_ID_BYTES: usize = 1024;

type MergedSeries = HashMap<String, BTreeMap<i64, Fields>>;

/// Rejects records that must never reach a partition.
pub fn validate_record(feed_id: &str, fields: &Fields) -> Result<(), BufferError> {
    if feed_id.is_empty() {
        return Err(BufferError::malformed("feed id is empty"));
    }
    if feed_id.len() > MAX_FEED_ID_BYTES {
        return Err(BufferError::malformed(format!(
            "feed id longer than {MAX_FEED_ID_BYTES} bytes"
        )));
    }
    if fields.is_empty() {
        return Err(BufferError::malformed(format!(
            "record for feed '{feed_id}' has no fields"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RingState {
    current_index: usize,
    partitions: usize,
    #[serde(default)]
    stores: usize,
    #[serde(default)]
    slots: Vec<usize>,
    #[serde(default)]
    draining: Vec<DrainingState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct DrainingState {
    store: usize,
    until_epoch_millis: i64,
}

/// Which store backs each partition slot, and which slot takes writes.
#[derive(Debug, Clone)]
struct Cursor {
    index: usize,
    slots: Vec<usize>,
}

/// A retired store that stays readable until `until`.
#[derive(Debug, Clone, Copy)]
struct Draining {
    store: usize,
    until: Instant,
}

#[derive(Debug)]
struct RotationState {
    prepared: Option<usize>,
    /// Cleared stores ready to back the next slot.
    spare: Vec<usize>,
    /// Stores past their overlap window whose reset failed; retried on the next
    /// preparation.
    expired: Vec<usize>,
}

/// Fixed ring of partitions. Writes go to the current partition; reads span the
/// whole ring; rotation reuses the oldest partition.
///
/// Each partition slot is backed by one of `config.store_count()` stores. When a
/// slot is reused it gets a cleared spare store, and the store holding its old
/// contents stays readable for `overlap` before it is cleared and becomes a spare.
pub struct BufferRing {
    kind: StorageKind,
    config: RingConfig,
    stores: Vec<Box<dyn PartitionStore>>,
    metadata: PartitionMetadata,
    // Writers hold the read side for the duration of a put so rotation never
    // swaps the pointer under an in-flight write.
    current: RwLock<Cursor>,
    draining: RwLock<Vec<Draining>>,
    rotation: Mutex<RotationState>,
    state_path: Option<PathBuf>,
    metrics: RingMetricsCollector,
}

impl BufferRing {
    pub fn memory(config: &RingConfig) -> Result<Self, BufferError> {
        config.validate(StorageKind::Memory)?;
        let stores = (0..config.store_count())
            .map(|index| {
                Box::new(MemoryPartition::new(index, config.max_partition_bytes))
                    as Box<dyn PartitionStore>
            })
            .collect();
        let ring = Self::with_partitions(StorageKind::Memory, config.clone(), stores)?;
        info!(
            "Memory ring ready: {} partitions of {} bytes, rotation {:?}, overlap {:?}",
            config.partitions,
            config.max_partition_bytes,
            config.rotation_interval,
            config.overlap
        );
        Ok(ring)
    }

    /// Opens (or creates) a disk ring under `location`, restoring the slot layout
    /// and the partition metadata of a previous run.
    #[cfg(feature = "disk")]
    pub fn disk(config: &RingConfig, location: &Path) -> Result<Self, BufferError> {
        config.validate(StorageKind::Disk)?;
        ensure_writable_dir(location)?;

        let mut stores: Vec<Box<dyn PartitionStore>> = Vec::with_capacity(config.store_count());
        for index in 0..config.store_count() {
            stores.push(Box::new(DiskPartition::open(
                index,
                location,
                config.max_partition_bytes,
            )?));
        }

        let mut ring = Self::with_partitions(StorageKind::Disk, config.clone(), stores)?;
        ring.state_path = Some(location.join(RING_STATE_FILE));
        ring.restore_state()?;
        info!(
            "Disk ring ready at {}: {} partitions, current partition {}",
            location.display(),
            config.partitions,
            ring.current_partition_index()
        );
        Ok(ring)
    }

    /// Builds a ring over caller-supplied stores; `config.store_count()` of them.
    pub fn with_partitions(
        kind: StorageKind,
        config: RingConfig,
        stores: Vec<Box<dyn PartitionStore>>,
    ) -> Result<Self, BufferError> {
        if config.partitions == 0 {
            return Err(BufferError::invalid_config(format!(
                "{kind} ring needs at least one partition"
            )));
        }
        if stores.len() != config.store_count() {
            return Err(BufferError::invalid_config(format!(
                "{kind} ring with {} partitions needs {} stores but {} were supplied",
                config.partitions,
                config.store_count(),
                stores.len()
            )));
        }

        let count = stores.len();
        let partitions = config.partitions;
        Ok(Self {
            kind,
            metadata: PartitionMetadata::new(count),
            stores,
            current: RwLock::new(Cursor {
                index: 0,
                slots: (0..partitions).collect(),
            }),
            draining: RwLock::new(Vec::new()),
            rotation: Mutex::new(RotationState {
                prepared: None,
                spare: (partitions..count).rev().collect(),
                expired: Vec::new(),
            }),
            config,
            state_path: None,
            metrics: RingMetricsCollector::new(),
        })
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn rotation_interval(&self) -> Option<Duration> {
        self.config.rotation_interval
    }

    pub fn overlap(&self) -> Duration {
        self.config.overlap
    }

    pub fn partition_count(&self) -> usize {
        self.config.partitions
    }

    pub fn current_partition_index(&self) -> usize {
        self.current.read().index
    }

    pub fn put_nanos(&self, feed_id: &str, timestamp: i64, fields: &Fields) -> Result<(), BufferError> {
        if let Err(e) = validate_record(feed_id, fields) {
            self.metrics.record_rejected();
            return Err(e);
        }

        let cursor = self.current.read();
        let store = cursor.slots[cursor.index];
        match self.stores[store].put(feed_id, timestamp, fields) {
            Ok(()) => {
                self.metadata.record(store, feed_id, timestamp);
                self.metrics.record_written(1);
                Ok(())
            }
            Err(e) => {
                self.metrics.record_rejected();
                Err(e)
            }
        }
    }

    /// Writes every entry of one feed. A malformed entry rejects the whole call
    /// before anything is stored.
    pub fn put_bulk_nanos(
        &self,
        feed_id: &str,
        entries: &BTreeMap<i64, Fields>,
    ) -> Result<usize, BufferError> {
        if let Err(e) = entries
            .values()
            .try_for_each(|fields| validate_record(feed_id, fields))
        {
            self.metrics.record_rejected();
            return Err(e);
        }

        let cursor = self.current.read();
        let store = cursor.slots[cursor.index];
        match self.stores[store].put_bulk(feed_id, entries) {
            Ok(applied) => {
                if let (Some(first), Some(last)) = (entries.keys().next(), entries.keys().next_back()) {
                    self.metadata.record(store, feed_id, *first);
                    self.metadata.record(store, feed_id, *last);
                }
                self.metrics.record_written(applied as u64);
                Ok(applied)
            }
            Err(e) => {
                self.refresh_metadata(store);
                self.metrics.record_rejected();
                Err(e)
            }
        }
    }

    /// Multi-feed write. `on_complete` runs exactly once, also when the batch is
    /// rejected up front.
    pub fn put_batch_nanos(
        &self,
        batch: &FeedBatch,
        on_complete: CompletionCallback,
    ) -> Result<usize, BufferError> {
        let invalid = batch.iter().find_map(|(feed_id, entries)| {
            entries
                .values()
                .try_for_each(|fields| validate_record(feed_id, fields))
                .err()
        });
        if let Some(e) = invalid {
            self.metrics.record_rejected();
            on_complete();
            return Err(e);
        }

        let cursor = self.current.read();
        let store = cursor.slots[cursor.index];
        match self.stores[store].put_batch(batch, on_complete) {
            Ok(applied) => {
                for (feed_id, entries) in batch {
                    if let (Some(first), Some(last)) =
                        (entries.keys().next(), entries.keys().next_back())
                    {
                        self.metadata.record(store, feed_id, *first);
                        self.metadata.record(store, feed_id, *last);
                    }
                }
                self.metrics.record_written(applied as u64);
                Ok(applied)
            }
            Err(e) => {
                self.refresh_metadata(store);
                self.metrics.record_rejected();
                Err(e)
            }
        }
    }

    /// Records of `feed_ids` in `[start, end]` (nanoseconds) across all partitions.
    pub fn get_nanos(&self, feed_ids: &[String], start: i64, end: i64) -> FeedData {
        into_feed_data(self.collect(feed_ids, start, end), TimeUnit::Nanoseconds)
    }

    /// Last record of each requested feed inside `[start, end]`, in `unit`.
    pub fn get_latest(&self, feed_ids: &[String], unit: TimeUnit, start: i64, end: i64) -> FeedData {
        let merged = self.collect(feed_ids, unit.start_to_nanos(start), unit.end_to_nanos(end));
        merged
            .into_iter()
            .filter_map(|(feed_id, series)| {
                let (ts, fields) = series.into_iter().next_back()?;
                let record = Record::new(feed_id.clone(), unit.from_nanos(ts), fields);
                Some((feed_id, vec![record]))
            })
            .collect()
    }

    pub fn is_fully_within_nanos(&self, feed_id: &str, start: i64) -> bool {
        self.earliest(feed_id).is_some_and(|earliest| earliest <= start)
    }

    /// Makes sure a cleared store is ready for the partition that the next
    /// rotation makes current, releasing retired stores whose overlap has passed.
    ///
    /// Idempotent until the next rotation. Fails with `RotationDeferred` while every
    /// spare store is still inside its overlap window.
    pub fn prepare_next(&self) -> Result<usize, BufferError> {
        let mut rotation = self.rotation.lock();
        self.prepare_locked(&mut rotation)
    }

    fn prepare_locked(&self, rotation: &mut RotationState) -> Result<usize, BufferError> {
        let next = (self.current_partition_index() + 1) % self.config.partitions;
        if rotation.prepared == Some(next) && !rotation.spare.is_empty() {
            return Ok(next);
        }

        let release = self.release_expired(rotation);
        if rotation.spare.is_empty() {
            release?;
            let now = Instant::now();
            let remaining = self
                .draining
                .read()
                .iter()
                .map(|d| d.until.saturating_duration_since(now))
                .min()
                .unwrap_or_default();
            return Err(BufferError::RotationDeferred {
                partition: next,
                remaining,
            });
        }
        if let Err(e) = release {
            warn!("{} ring: {}", self.kind, e);
        }

        rotation.prepared = Some(next);
        debug!("Prepared {} partition {} for reuse", self.kind, next);
        Ok(next)
    }

    /// Clears the stores whose overlap window has passed and hands them back as
    /// spares.
    fn release_expired(&self, rotation: &mut RotationState) -> Result<(), BufferError> {
        let now = Instant::now();
        {
            let mut draining = self.draining.write();
            draining.retain(|d| {
                if d.until <= now {
                    rotation.expired.push(d.store);
                    false
                } else {
                    true
                }
            });
        }

        let mut first_error = None;
        for store in std::mem::take(&mut rotation.expired) {
            self.metadata.clear(store);
            match self.stores[store].reset() {
                Ok(()) => rotation.spare.push(store),
                Err(e) => {
                    rotation.expired.push(store);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Advances the current pointer, preparing the next partition first when the
    /// scheduler has not already done so. On failure the ring stays put.
    pub fn rotate(&self) -> Result<usize, BufferError> {
        let mut rotation = self.rotation.lock();
        let next = match self.prepare_locked(&mut rotation) {
            Ok(next) => next,
            Err(e) => {
                self.metrics.record_rotation_failure();
                return Err(e);
            }
        };
        let Some(fresh) = rotation.spare.pop() else {
            self.metrics.record_rotation_failure();
            return Err(BufferError::RotationDeferred {
                partition: next,
                remaining: self.config.overlap,
            });
        };

        // Publish the outgoing store as draining before the swap so readers always
        // find it in one of the two places.
        let outgoing = self.current.read().slots[next];
        self.draining.write().push(Draining {
            store: outgoing,
            until: Instant::now() + self.config.overlap,
        });
        let retired = {
            let mut cursor = self.current.write();
            cursor.slots[next] = fresh;
            std::mem::replace(&mut cursor.index, next)
        };
        rotation.prepared = None;
        drop(rotation);

        self.metrics.record_rotation();
        if let Err(e) = self.persist_state() {
            warn!("Failed to persist {} ring state: {}", self.kind, e);
        }
        info!("Rotated {} ring from partition {} to {}", self.kind, retired, next);
        Ok(next)
    }

    pub fn stats(&self) -> RingStats {
        let cursor = self.current.read().clone();
        let now = Instant::now();
        RingStats {
            current_index: cursor.index,
            partitions: cursor
                .slots
                .iter()
                .enumerate()
                .map(|(index, &store)| PartitionStats {
                    index,
                    feeds: self.metadata.feed_count(store),
                    usage_bytes: self.stores[store].usage_bytes(),
                    current: index == cursor.index,
                })
                .collect(),
            draining_partitions: self.draining.read().iter().filter(|d| d.until > now).count(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Clears every partition in place, retired ones included. The current index is
    /// kept.
    pub fn reset(&self) -> Result<(), BufferError> {
        let mut rotation = self.rotation.lock();
        let cursor = self.current.write();
        let mut draining = self.draining.write();
        self.metadata.clear_all();
        for store in &self.stores {
            store.reset()?;
        }
        draining.clear();
        rotation.prepared = None;
        rotation.expired.clear();
        rotation.spare = (0..self.stores.len())
            .rev()
            .filter(|store| !cursor.slots.contains(store))
            .collect();
        drop(draining);
        drop(cursor);
        drop(rotation);

        self.metrics.reset();
        self.persist_state()?;
        info!("Reset {} ring", self.kind);
        Ok(())
    }

    pub fn close(&self) -> Result<(), BufferError> {
        let mut first_error = None;
        for store in &self.stores {
            if let Err(e) = store.close() {
                warn!("Failed to close {} store {}: {}", self.kind, store.index(), e);
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.persist_state() {
            first_error.get_or_insert(e);
        }
        debug!("Closed {} ring", self.kind);
        first_error.map_or(Ok(()), Err)
    }

    /// Stores answering reads, newest contents first: the partition slots from the
    /// current one backwards, then retired stores still inside their overlap.
    fn readable_stores(&self) -> Vec<usize> {
        let mut stores: Vec<usize> = {
            let cursor = self.current.read();
            let count = cursor.slots.len();
            (0..count)
                .map(|offset| cursor.slots[(cursor.index + count - offset) % count])
                .collect()
        };
        let now = Instant::now();
        let draining: Vec<usize> = self
            .draining
            .read()
            .iter()
            .rev()
            .filter(|d| d.until > now && !stores.contains(&d.store))
            .map(|d| d.store)
            .collect();
        stores.extend(draining);
        stores
    }

    fn earliest(&self, feed_id: &str) -> Option<i64> {
        self.metadata.earliest_in(&self.readable_stores(), feed_id)
    }

    fn collect(&self, feed_ids: &[String], start: i64, end: i64) -> MergedSeries {
        self.metrics.record_query();
        let mut merged = MergedSeries::new();
        if start > end || feed_ids.is_empty() {
            return merged;
        }

        // Newest store first: it wins on duplicate timestamps.
        for store in self.readable_stores() {
            let feeds = self.metadata.intersecting_feeds(store, feed_ids, start, end);
            if feeds.is_empty() {
                continue;
            }
            match self.stores[store].get(&feeds, start, end) {
                Ok(data) => {
                    for (feed_id, records) in data {
                        let series = merged.entry(feed_id).or_default();
                        for record in records {
                            series.entry(record.timestamp).or_insert(record.fields);
                        }
                    }
                }
                Err(e) => warn!("Read from {} store {} failed: {}", self.kind, store, e),
            }
        }
        merged
    }

    fn refresh_metadata(&self, store: usize) {
        match self.stores[store].feed_bounds() {
            Ok(bounds) => self.metadata.replace(store, bounds),
            Err(e) => warn!("Cannot rebuild metadata of {} store {}: {}", self.kind, store, e),
        }
    }

    #[cfg(feature = "disk")]
    fn restore_state(&self) -> Result<(), BufferError> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };

        let state = match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<RingState>(&bytes) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("Ignoring unreadable ring state {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if let Some(state) = state {
            if !self.layout_fits(&state) {
                warn!(
                    "Ring state at {} describes {} partitions over {} stores (current {}), \
                     configured {} over {}; resetting",
                    path.display(),
                    state.partitions,
                    state.stores,
                    state.current_index,
                    self.config.partitions,
                    self.stores.len()
                );
                return self.reset();
            }

            let now_wall = chrono::Utc::now().timestamp_millis();
            let now = Instant::now();
            let restored: Vec<Draining> = state
                .draining
                .iter()
                .filter_map(|entry| {
                    let remaining = entry.until_epoch_millis.saturating_sub(now_wall);
                    (remaining > 0).then(|| Draining {
                        store: entry.store,
                        until: now + Duration::from_millis(remaining.unsigned_abs()),
                    })
                })
                .collect();

            let mut rotation = self.rotation.lock();
            *self.current.write() = Cursor {
                index: state.current_index,
                slots: state.slots.clone(),
            };
            rotation.spare = (0..self.stores.len())
                .rev()
                .filter(|store| {
                    !state.slots.contains(store) && !restored.iter().any(|d| d.store == *store)
                })
                .collect();
            *self.draining.write() = restored;
        }

        // Spare stores must be empty before they back a partition.
        for &store in &self.rotation.lock().spare {
            self.stores[store].reset()?;
        }
        for (index, store) in self.stores.iter().enumerate() {
            self.metadata.replace(index, store.feed_bounds()?);
        }
        self.persist_state()
    }

    #[cfg(feature = "disk")]
    fn layout_fits(&self, state: &RingState) -> bool {
        let stores = self.stores.len();
        let mut seen = vec![false; stores];
        let mut claim = |store: usize| {
            if store >= stores || seen[store] {
                return false;
            }
            seen[store] = true;
            true
        };
        state.partitions == self.config.partitions
            && state.stores == stores
            && state.slots.len() == self.config.partitions
            && state.current_index < self.config.partitions
            && state.slots.iter().all(|&store| claim(store))
            && state.draining.iter().all(|d| claim(d.store))
    }

    fn persist_state(&self) -> Result<(), BufferError> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        let cursor = self.current.read().clone();
        let now_wall = chrono::Utc::now().timestamp_millis();
        let now = Instant::now();
        let draining = self
            .draining
            .read()
            .iter()
            .filter(|d| d.until > now)
            .map(|d| DrainingState {
                store: d.store,
                until_epoch_millis: now_wall.saturating_add(
                    i64::try_from(d.until.duration_since(now).as_millis()).unwrap_or(i64::MAX),
                ),
            })
            .collect();
        let state = RingState {
            current_index: cursor.index,
            partitions: self.config.partitions,
            stores: self.stores.len(),
            slots: cursor.slots,
            draining,
        };
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&state)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl std::fmt::Debug for BufferRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferRing")
            .field("kind", &self.kind)
            .field("partitions", &self.config.partitions)
            .field("stores", &self.stores.len())
            .field("current", &self.current_partition_index())
            .field("config", &self.config)
            .finish()
    }
}

fn into_feed_data(merged: MergedSeries, unit: TimeUnit) -> FeedData {
    merged
        .into_iter()
        .filter(|(_, series)| !series.is_empty())
        .map(|(feed_id, series)| {
            let mut records: Vec<Record> = series
                .into_iter()
                .map(|(ts, fields)| Record::new(feed_id.clone(), unit.from_nanos(ts), fields))
                .collect();
            records.dedup_by_key(|record| record.timestamp);
            (feed_id, records)
        })
        .collect()
}

fn entries_to_nanos(
    feed_id: &str,
    unit: TimeUnit,
    entries: &BTreeMap<i64, Fields>,
) -> Result<BTreeMap<i64, Fields>, BufferError> {
    entries
        .iter()
        .map(|(ts, fields)| Ok((timestamp_to_nanos(feed_id, unit, *ts)?, fields.clone())))
        .collect()
}

fn timestamp_to_nanos(feed_id: &str, unit: TimeUnit, timestamp: i64) -> Result<i64, BufferError> {
    unit.to_nanos(timestamp).ok_or_else(|| {
        BufferError::malformed(format!(
            "timestamp {timestamp}{unit} of feed '{feed_id}' does not fit in nanoseconds"
        ))
    })
}

impl DataProvider for BufferRing {
    fn name(&self) -> String {
        format!("{}-ring", self.kind)
    }

    fn level_of_service(&self) -> LevelOfService {
        self.kind.level_of_service()
    }

    fn get_data(
        &self,
        feed_ids: &[String],
        unit: TimeUnit,
        start: i64,
        end: i64,
    ) -> Result<FeedData, BufferError> {
        let merged = self.collect(feed_ids, unit.start_to_nanos(start), unit.end_to_nanos(end));
        Ok(into_feed_data(merged, unit))
    }

    fn is_fully_within_time_span(&self, feed_id: &str, unit: TimeUnit, start: i64) -> bool {
        self.earliest(feed_id)
            .is_some_and(|earliest| unit.from_nanos(earliest) <= start)
    }
}

impl DataArchive for BufferRing {
    fn put_data(
        &self,
        feed_id: &str,
        unit: TimeUnit,
        timestamp: i64,
        fields: &Fields,
    ) -> Result<(), BufferError> {
        let nanos = timestamp_to_nanos(feed_id, unit, timestamp)?;
        self.put_nanos(feed_id, nanos, fields)
    }

    fn put_bulk(
        &self,
        feed_id: &str,
        unit: TimeUnit,
        entries: &BTreeMap<i64, Fields>,
    ) -> Result<(), BufferError> {
        let entries = entries_to_nanos(feed_id, unit, entries)?;
        self.put_bulk_nanos(feed_id, &entries).map(|_| ())
    }

    fn put_batch(
        &self,
        batch: &FeedBatch,
        unit: TimeUnit,
        on_complete: CompletionCallback,
    ) -> Result<(), BufferError> {
        let converted: Result<FeedBatch, BufferError> = batch
            .iter()
            .map(|(feed_id, entries)| {
                Ok((feed_id.clone(), entries_to_nanos(feed_id, unit, entries)?))
            })
            .collect();
        match converted {
            Ok(converted) => self.put_batch_nanos(&converted, on_complete).map(|_| ()),
            Err(e) => {
                on_complete();
                Err(e)
            }
        }
    }

    fn reset(&self) -> Result<(), BufferError> {
        BufferRing::reset(self)
    }

    fn close(&self) -> Result<(), BufferError> {
        BufferRing::close(self)
    }
}
