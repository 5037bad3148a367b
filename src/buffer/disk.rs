use super::budget::{ByteBudget, StoragePressure};
use super::error::BufferError;
use super::partition::{PartitionStore, TimeSpan};
use crate::domain::{FeedData, Fields, Record};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const TIMESTAMP_BIAS: u64 = 1 << 63;

/// Disk-backed partition: one sled database per partition directory.
///
/// Keys are `u16 feed length | feed bytes | biased big-endian timestamp`, so a
/// feed's records form one contiguous, time-ordered key range.
pub struct DiskPartition {
    index: usize,
    path: PathBuf,
    db: RwLock<Option<sled::Db>>,
    budget: ByteBudget,
}

impl DiskPartition {
    pub fn open(index: usize, root: &Path, max_bytes: u64) -> Result<Self, BufferError> {
        let path = root.join(format!("partition-{index}"));
        let db = open_db(index, &path)?;
        let budget = ByteBudget::new(index, max_bytes);
        budget.set(measure_usage(index, &db)?);

        tracing::debug!(
            "Opened disk partition {} at {} ({} bytes retained)",
            index,
            path.display(),
            budget.used()
        );

        Ok(Self {
            index,
            path,
            db: RwLock::new(Some(db)),
            budget,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pressure(&self) -> StoragePressure {
        self.budget.pressure()
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&sled::Db) -> Result<T, BufferError>,
    ) -> Result<T, BufferError> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(BufferError::Closed {
            partition: self.index,
        })?;
        f(db)
    }

    fn storage_error(&self, e: sled::Error) -> BufferError {
        map_sled_error(self.index, e)
    }
}

impl PartitionStore for DiskPartition {
    fn index(&self) -> usize {
        self.index
    }

    fn put(&self, feed_id: &str, timestamp: i64, fields: &Fields) -> Result<(), BufferError> {
        let key = encode_key(feed_id, timestamp)?;
        let value = bincode::serde::encode_to_vec(fields, bincode::config::standard())
            .map_err(|e| BufferError::Serialization(e.to_string()))?;
        let size = (key.len() + value.len()) as u64;

        self.with_db(|db| {
            self.budget.reserve(size)?;
            match db.insert(key.as_slice(), value) {
                Ok(Some(old)) => {
                    self.budget.release((key.len() + old.len()) as u64);
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(e) => {
                    self.budget.release(size);
                    Err(self.storage_error(e))
                }
            }
        })
    }

    fn get(&self, feed_ids: &[String], start: i64, end: i64) -> Result<FeedData, BufferError> {
        let mut result = FeedData::new();
        if start > end {
            return Ok(result);
        }
        self.with_db(|db| {
            for feed_id in feed_ids {
                let (Ok(lower), Ok(upper)) =
                    (encode_key(feed_id, start), encode_key(feed_id, end))
                else {
                    continue;
                };

                let mut records = Vec::new();
                for item in db.range(lower..=upper) {
                    let (key, value) = item.map_err(|e| self.storage_error(e))?;
                    let timestamp = decode_timestamp(&key)?;
                    let (fields, _): (Fields, usize) =
                        bincode::serde::decode_from_slice(&value, bincode::config::standard())
                            .map_err(|e| BufferError::Serialization(e.to_string()))?;
                    records.push(Record::new(feed_id.clone(), timestamp, fields));
                }

                if !records.is_empty() {
                    result.insert(feed_id.clone(), records);
                }
            }
            Ok(result)
        })
    }

    fn is_fully_within_time_span(&self, feed_id: &str, start: i64) -> bool {
        let Ok(prefix) = feed_prefix(feed_id) else {
            return false;
        };
        self.with_db(|db| match db.scan_prefix(&prefix).next() {
            Some(Ok((key, _))) => Ok(decode_timestamp(&key)? <= start),
            Some(Err(e)) => Err(self.storage_error(e)),
            None => Ok(false),
        })
        .unwrap_or_else(|e| {
            tracing::warn!("Span check on partition {} failed: {}", self.index, e);
            false
        })
    }

    fn feed_bounds(&self) -> Result<HashMap<String, TimeSpan>, BufferError> {
        self.with_db(|db| {
            let mut bounds: HashMap<String, TimeSpan> = HashMap::new();
            for item in db.iter() {
                let (key, _) = item.map_err(|e| self.storage_error(e))?;
                let feed_id = decode_feed(&key)?;
                let timestamp = decode_timestamp(&key)?;
                bounds
                    .entry(feed_id)
                    .and_modify(|span| span.extend(timestamp))
                    .or_insert_with(|| TimeSpan::point(timestamp));
            }
            Ok(bounds)
        })
    }

    fn usage_bytes(&self) -> u64 {
        self.budget.used()
    }

    fn reset(&self) -> Result<(), BufferError> {
        let mut guard = self.db.write();
        if guard.is_none() {
            *guard = Some(open_db(self.index, &self.path)?);
        }
        if let Some(db) = guard.as_ref() {
            db.clear().map_err(|e| self.storage_error(e))?;
            db.flush().map_err(|e| self.storage_error(e))?;
        }
        self.budget.set(0);
        Ok(())
    }

    fn close(&self) -> Result<(), BufferError> {
        let mut guard = self.db.write();
        if let Some(db) = guard.take() {
            db.flush().map_err(|e| self.storage_error(e))?;
            tracing::debug!("Closed disk partition {}", self.index);
        }
        Ok(())
    }
}

impl std::fmt::Debug for DiskPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskPartition")
            .field("index", &self.index)
            .field("path", &self.path)
            .field("open", &self.db.read().is_some())
            .field("usage", &self.budget.used())
            .finish()
    }
}

fn open_db(index: usize, path: &Path) -> Result<sled::Db, BufferError> {
    sled::Config::new()
        .path(path)
        .open()
        .map_err(|e| map_sled_error(index, e))
}

fn measure_usage(index: usize, db: &sled::Db) -> Result<u64, BufferError> {
    let mut total = 0u64;
    for item in db.iter() {
        let (key, value) = item.map_err(|e| map_sled_error(index, e))?;
        total += (key.len() + value.len()) as u64;
    }
    Ok(total)
}

fn map_sled_error(partition: usize, e: sled::Error) -> BufferError {
    match e {
        sled::Error::Io(io) if io.kind() == std::io::ErrorKind::StorageFull => {
            BufferError::CapacityExceeded {
                partition,
                details: io.to_string(),
            }
        }
        other => BufferError::Storage {
            partition,
            details: other.to_string(),
        },
    }
}

fn feed_prefix(feed_id: &str) -> Result<Vec<u8>, BufferError> {
    let len = u16::try_from(feed_id.len())
        .map_err(|_| BufferError::malformed(format!("feed id longer than {} bytes", u16::MAX)))?;
    let mut prefix = Vec::with_capacity(2 + feed_id.len() + 8);
    prefix.extend_from_slice(&len.to_be_bytes());
    prefix.extend_from_slice(feed_id.as_bytes());
    Ok(prefix)
}

fn encode_key(feed_id: &str, timestamp: i64) -> Result<Vec<u8>, BufferError> {
    let mut key = feed_prefix(feed_id)?;
    key.extend_from_slice(&((timestamp as u64) ^ TIMESTAMP_BIAS).to_be_bytes());
    Ok(key)
}

fn decode_timestamp(key: &[u8]) -> Result<i64, BufferError> {
    let tail: [u8; 8] = key
        .len()
        .checked_sub(8)
        .and_then(|at| key[at..].try_into().ok())
        .ok_or_else(|| BufferError::Serialization("truncated partition key".to_string()))?;
    Ok((u64::from_be_bytes(tail) ^ TIMESTAMP_BIAS) as i64)
}

fn decode_feed(key: &[u8]) -> Result<String, BufferError> {
    let truncated = || BufferError::Serialization("truncated partition key".to_string());
    let len_bytes: [u8; 2] = key.get(..2).and_then(|b| b.try_into().ok()).ok_or_else(truncated)?;
    let len = u16::from_be_bytes(len_bytes) as usize;
    let feed = key.get(2..2 + len).ok_or_else(truncated)?;
    String::from_utf8(feed.to_vec()).map_err(|e| BufferError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fields;
    use tempfile::TempDir;

    #[test]
    fn test_key_order_follows_signed_timestamps() {
        let a = encode_key("f", -5).unwrap();
        let b = encode_key("f", 0).unwrap();
        let c = encode_key("f", 7).unwrap();
        assert!(a < b && b < c);
        assert_eq!(decode_timestamp(&a).unwrap(), -5);
        assert_eq!(decode_feed(&c).unwrap(), "f");
    }

    #[test]
    fn test_feed_prefixes_do_not_collide() {
        // "ab" must not be a key-prefix of "abc" records
        let short = feed_prefix("ab").unwrap();
        let long = encode_key("abc", 1).unwrap();
        assert!(!long.starts_with(&short));
    }

    #[test]
    fn test_disk_partition_round_trip_and_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let partition = DiskPartition::open(0, dir.path(), 1024 * 1024).unwrap();
            partition.put("temp", 10, &fields([("value", "1")])).unwrap();
            partition.put("temp", 20, &fields([("value", "2")])).unwrap();
            partition.close().unwrap();
        }

        let partition = DiskPartition::open(0, dir.path(), 1024 * 1024).unwrap();
        let data = partition.get(&["temp".to_string()], 0, 15).unwrap();
        assert_eq!(data["temp"].len(), 1);
        assert_eq!(data["temp"][0].fields["value"], "1");
        assert!(partition.usage_bytes() > 0);

        let bounds = partition.feed_bounds().unwrap();
        assert_eq!(bounds["temp"], TimeSpan { min: 10, max: 20 });
    }

    #[test]
    fn test_disk_quota_raises_capacity_exceeded() {
        let dir = TempDir::new().unwrap();
        let partition = DiskPartition::open(3, dir.path(), 32).unwrap();
        let big = fields([("value", "x".repeat(64))]);
        let err = partition.put("temp", 1, &big).unwrap_err();
        assert!(matches!(err, BufferError::CapacityExceeded { partition: 3, .. }));
        assert!(partition.get(&["temp".to_string()], 0, 10).unwrap().is_empty());
    }

    #[test]
    fn test_closed_partition_rejects_writes_and_reset_reopens() {
        let dir = TempDir::new().unwrap();
        let partition = DiskPartition::open(1, dir.path(), 1024 * 1024).unwrap();
        partition.put("temp", 1, &fields([("value", "1")])).unwrap();
        partition.close().unwrap();
        partition.close().unwrap();

        assert_eq!(
            partition.put("temp", 2, &fields([("value", "2")])),
            Err(BufferError::Closed { partition: 1 })
        );

        partition.reset().unwrap();
        assert_eq!(partition.usage_bytes(), 0);
        assert!(partition.get(&["temp".to_string()], 0, 10).unwrap().is_empty());
        partition.put("temp", 3, &fields([("value", "3")])).unwrap();
        assert!(partition.is_fully_within_time_span("temp", 3));
    }
}
