//! Flat `key = value` buffer properties.
//!
//! Files may use dotted keys (`buffer.time.millis = 60000`) or nested tables; both
//! are flattened to the same dotted form before being applied.

use super::ConfigError;
use crate::buffer::{BufferConfig, RingConfig};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const BUFFER_PARTITIONS: &str = "buffer.partitions";
pub const BUFFER_TIME_MILLIS: &str = "buffer.time.millis";
pub const BUFFER_OVERLAP_MILLIS: &str = "buffer.partition.overlap.millis";
pub const BUFFER_DISK_LOC: &str = "buffer.disk.loc";
pub const BUFFER_MAX_BYTES: &str = "buffer.partition.max.bytes";
pub const MEMORY_PARTITIONS: &str = "memory.buffer.partition";
pub const MEMORY_TIME_MILLIS: &str = "memory.buffer.time.millis";
pub const MEMORY_OVERLAP_MILLIS: &str = "memory.buffer.partition.overlap.millis";
pub const MEMORY_MAX_BYTES: &str = "memory.buffer.partition.max.bytes";

/// Flattens a parsed TOML document into `(dotted.key, value)` pairs.
pub fn flatten_toml(value: &toml::Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(value, "", &mut out);
    out.sort();
    out
}

fn flatten_into(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, nested) in table {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(nested, &key, out);
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

/// Applies known keys onto `config` and returns the keys it did not recognise.
///
/// The memory ring inherits `buffer.partition.overlap.millis` unless
/// `memory.buffer.partition.overlap.millis` is given as well.
pub fn apply_properties<I, K, V>(config: &mut BufferConfig, properties: I) -> Result<Vec<String>, ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut ignored = Vec::new();
    let mut shared_overlap = None;
    let mut memory_overlap = None;

    for (key, value) in properties {
        let (key, value) = (key.as_ref(), value.as_ref().trim());
        match key {
            BUFFER_PARTITIONS => config.disk.partitions = parse(key, value)?,
            BUFFER_TIME_MILLIS => config.disk.rotation_interval = interval(key, value)?,
            BUFFER_OVERLAP_MILLIS => shared_overlap = Some(millis(key, value)?),
            BUFFER_DISK_LOC => config.disk_location = PathBuf::from(value),
            BUFFER_MAX_BYTES => config.disk.max_partition_bytes = parse(key, value)?,
            MEMORY_PARTITIONS => config.memory.partitions = parse(key, value)?,
            MEMORY_TIME_MILLIS => config.memory.rotation_interval = interval(key, value)?,
            MEMORY_OVERLAP_MILLIS => memory_overlap = Some(millis(key, value)?),
            MEMORY_MAX_BYTES => config.memory.max_partition_bytes = parse(key, value)?,
            other => ignored.push(other.to_string()),
        }
    }

    if let Some(overlap) = shared_overlap {
        config.disk.overlap = overlap;
        config.memory.overlap = overlap;
    }
    if let Some(overlap) = memory_overlap {
        config.memory.overlap = overlap;
    }
    Ok(ignored)
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn interval(key: &str, value: &str) -> Result<Option<Duration>, ConfigError> {
    let millis: i64 = parse(key, value)?;
    RingConfig::interval_from_millis(millis).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse::<u64>(key, value).map(Duration::from_millis)
}
