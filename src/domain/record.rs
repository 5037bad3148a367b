use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Opaque key/value pairs carried by a telemetry sample (e.g. `value`, `status`).
pub type Fields = HashMap<String, String>;

/// Query result: feed id to time-ordered records.
///
/// A feed with no matching records is absent from the map. Callers must not read
/// a missing key as "present but empty".
pub type FeedData = HashMap<String, Vec<Record>>;

/// Bulk ingestion payload: feed id to timestamp-keyed field maps.
pub type FeedBatch = HashMap<String, BTreeMap<i64, Fields>>;

/// Invoked exactly once when a bulk write has been applied, whether or not every
/// entry was accepted.
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// A single timestamped sample of one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub feed_id: String,
    pub timestamp: i64,
    pub fields: Fields,
}

impl Record {
    pub fn new(feed_id: impl Into<String>, timestamp: i64, fields: Fields) -> Self {
        Self {
            feed_id: feed_id.into(),
            timestamp,
            fields,
        }
    }

    /// Rough in-memory footprint, used for memory-bound accounting.
    pub fn estimated_size(feed_id: &str, fields: &Fields) -> usize {
        let payload: usize = fields.iter().map(|(k, v)| k.len() + v.len()).sum();
        feed_id.len() + std::mem::size_of::<i64>() + payload + fields.len() * 48
    }
}

/// Convenience constructor for a field map, mostly used by tests and producers.
pub fn fields<I, K, V>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
