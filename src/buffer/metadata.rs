use super::partition::TimeSpan;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Per-partition, per-feed min/max timestamp index.
///
/// Entries only widen while a partition is writable and are dropped wholesale when
/// the partition is reused.
#[derive(Debug)]
pub struct PartitionMetadata {
    partitions: Vec<RwLock<HashMap<String, TimeSpan>>>,
}

impl PartitionMetadata {
    pub fn new(partition_count: usize) -> Self {
        Self {
            partitions: (0..partition_count)
                .map(|_| RwLock::new(HashMap::new()))
                .collect(),
        }
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn record(&self, partition: usize, feed_id: &str, timestamp: i64) {
        let Some(entries) = self.partitions.get(partition) else {
            return;
        };
        let mut entries = entries.write();
        match entries.get_mut(feed_id) {
            Some(span) => span.extend(timestamp),
            None => {
                entries.insert(feed_id.to_string(), TimeSpan::point(timestamp));
            }
        }
    }

    pub fn replace(&self, partition: usize, spans: HashMap<String, TimeSpan>) {
        if let Some(entries) = self.partitions.get(partition) {
            *entries.write() = spans;
        }
    }

    pub fn clear(&self, partition: usize) {
        if let Some(entries) = self.partitions.get(partition) {
            entries.write().clear();
        }
    }

    pub fn clear_all(&self) {
        for entries in &self.partitions {
            entries.write().clear();
        }
    }

    pub fn span(&self, partition: usize, feed_id: &str) -> Option<TimeSpan> {
        self.partitions
            .get(partition)
            .and_then(|entries| entries.read().get(feed_id).copied())
    }

    /// Feeds of `feed_ids` whose span in `partition` intersects `[start, end]`.
    pub fn intersecting_feeds(
        &self,
        partition: usize,
        feed_ids: &[String],
        start: i64,
        end: i64,
    ) -> Vec<String> {
        let Some(entries) = self.partitions.get(partition) else {
            return Vec::new();
        };
        let entries = entries.read();
        feed_ids
            .iter()
            .filter(|feed_id| {
                entries
                    .get(feed_id.as_str())
                    .is_some_and(|span| span.intersects(start, end))
            })
            .cloned()
            .collect()
    }

    /// Earliest timestamp of `feed_id` across the given partitions.
    pub fn earliest_in(&self, partitions: &[usize], feed_id: &str) -> Option<i64> {
        partitions
            .iter()
            .filter_map(|&partition| self.span(partition, feed_id).map(|span| span.min))
            .min()
    }

    pub fn feed_count(&self, partition: usize) -> usize {
        self.partitions
            .get(partition)
            .map_or(0, |entries| entries.read().len())
    }
}
