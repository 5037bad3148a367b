use super::error::BufferError;
use crate::domain::StorageKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DISK_LOCATION: &str = "/tmp/telemetry-buffer/partitions";

/// Upper bound on stores kept readable through the overlap window. A ring whose
/// overlap spans more rotations than this defers rotation until one drains.
pub const MAX_DRAINING_STORES: usize = 8;

/// Sizing and scheduling of one buffer ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingConfig {
    pub partitions: usize,
    /// `None` disables automatic rotation (tests rotate by hand).
    #[serde(with = "optional_millis")]
    pub rotation_interval: Option<Duration>,
    #[serde(with = "millis")]
    pub overlap: Duration,
    pub max_partition_bytes: u64,
}

impl RingConfig {
    pub fn memory_default() -> Self {
        Self {
            partitions: 3,
            rotation_interval: Some(Duration::from_millis(300_000)),
            overlap: Duration::from_millis(60_000),
            max_partition_bytes: 64 * 1024 * 1024, // 64MB
        }
    }

    pub fn disk_default() -> Self {
        Self {
            partitions: 5,
            rotation_interval: Some(Duration::from_millis(3_600_000)),
            overlap: Duration::from_millis(60_000),
            max_partition_bytes: 256 * 1024 * 1024, // 256MB
        }
    }

    /// Converts the `-1 disables` millisecond convention used by configuration keys.
    pub fn interval_from_millis(millis: i64) -> Result<Option<Duration>, BufferError> {
        match millis {
            -1 => Ok(None),
            m if m > 0 => Ok(Some(Duration::from_millis(m as u64))),
            m => Err(BufferError::invalid_config(format!(
                "rotation interval must be -1 or positive, got {m}"
            ))),
        }
    }

    pub fn validate(&self, kind: StorageKind) -> Result<(), BufferError> {
        if self.partitions == 0 {
            return Err(BufferError::invalid_config(format!(
                "{kind} ring needs at least one partition"
            )));
        }
        if self.max_partition_bytes == 0 {
            return Err(BufferError::invalid_config(format!(
                "{kind} partition size bound must be greater than 0"
            )));
        }
        if self.rotation_interval == Some(Duration::ZERO) {
            return Err(BufferError::invalid_config(format!(
                "{kind} rotation interval must be positive"
            )));
        }
        Ok(())
    }

    /// Guaranteed minimum age a record reaches before it stops being readable:
    /// `(partitions - 1) * interval + overlap`.
    pub fn minimum_retention(&self) -> Option<Duration> {
        self.rotation_interval.map(|interval| {
            let rotations = u32::try_from(self.partitions.saturating_sub(1)).unwrap_or(u32::MAX);
            interval.saturating_mul(rotations).saturating_add(self.overlap)
        })
    }

    /// Stores that hold retired partition contents while the overlap window runs.
    pub fn draining_capacity(&self) -> usize {
        match self.rotation_interval {
            Some(interval) if !self.overlap.is_zero() => {
                let needed = self.overlap.as_nanos().div_ceil(interval.as_nanos());
                usize::try_from(needed)
                    .unwrap_or(MAX_DRAINING_STORES)
                    .clamp(1, MAX_DRAINING_STORES)
            }
            _ => 1,
        }
    }

    /// Physical stores backing the ring: one per partition plus the draining ones.
    pub fn store_count(&self) -> usize {
        self.partitions + self.draining_capacity()
    }
}

/// Configuration for every ring kind the registry can build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferConfig {
    pub memory: RingConfig,
    pub disk: RingConfig,
    pub disk_location: PathBuf,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            memory: RingConfig::memory_default(),
            disk: RingConfig::disk_default(),
            disk_location: PathBuf::from(DEFAULT_DISK_LOCATION),
        }
    }
}

impl BufferConfig {
    pub fn ring(&self, kind: StorageKind) -> &RingConfig {
        match kind {
            StorageKind::Memory => &self.memory,
            StorageKind::Disk => &self.disk,
        }
    }

    pub fn validate(&self) -> Result<(), BufferError> {
        self.memory.validate(StorageKind::Memory)?;
        self.disk.validate(StorageKind::Disk)?;
        if self.disk_location.as_os_str().is_empty() {
            return Err(BufferError::invalid_config("disk location must not be empty"));
        }
        Ok(())
    }
}

/// Creates `path` when needed and fails fast when it cannot be written to.
pub fn ensure_writable_dir(path: &Path) -> Result<(), BufferError> {
    std::fs::create_dir_all(path).map_err(|e| {
        BufferError::invalid_config(format!(
            "cannot create disk location {}: {e}",
            path.display()
        ))
    })?;
    let metadata = std::fs::metadata(path).map_err(|e| {
        BufferError::invalid_config(format!("cannot inspect {}: {e}", path.display()))
    })?;
    if !metadata.is_dir() {
        return Err(BufferError::invalid_config(format!(
            "disk location {} is not a directory",
            path.display()
        )));
    }

    let marker = path.join(format!(".write-check-{}", std::process::id()));
    std::fs::write(&marker, b"").map_err(|e| {
        BufferError::invalid_config(format!(
            "disk location {} is not writable: {e}",
            path.display()
        ))
    })?;
    if let Err(e) = std::fs::remove_file(&marker) {
        tracing::warn!("Failed to remove {}: {}", marker.display(), e);
    }
    Ok(())
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_i64(d.as_millis() as i64),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        super::RingConfig::interval_from_millis(millis).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_conventions() {
        assert_eq!(RingConfig::interval_from_millis(-1), Ok(None));
        assert_eq!(
            RingConfig::interval_from_millis(5000),
            Ok(Some(Duration::from_secs(5)))
        );
        assert!(RingConfig::interval_from_millis(0).is_err());
        assert!(RingConfig::interval_from_millis(-7).is_err());
    }

    #[test]
    fn test_zero_partitions_rejected() {
        let mut config = BufferConfig::default();
        config.memory.partitions = 0;
        assert!(matches!(
            config.validate(),
            Err(BufferError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_minimum_retention() {
        let config = RingConfig {
            partitions: 3,
            rotation_interval: Some(Duration::from_secs(5)),
            overlap: Duration::from_secs(1),
            max_partition_bytes: 1024,
        };
        assert_eq!(config.minimum_retention(), Some(Duration::from_secs(11)));

        let single = RingConfig {
            partitions: 1,
            ..config.clone()
        };
        assert_eq!(single.minimum_retention(), Some(Duration::from_secs(1)));

        let manual = RingConfig {
            rotation_interval: None,
            ..config
        };
        assert_eq!(manual.minimum_retention(), None);
    }

    #[test]
    fn test_ring_config_serde_uses_minus_one_for_disabled() {
        let config = RingConfig {
            rotation_interval: None,
            ..RingConfig::memory_default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["rotation_interval"], -1);
        let back: RingConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_disabled_interval_must_be_minus_one_in_serialized_form() {
        let mut json = serde_json::to_value(RingConfig::memory_default()).unwrap();
        for bad in [0, -7] {
            json["rotation_interval"] = serde_json::json!(bad);
            let err = serde_json::from_value::<RingConfig>(json.clone()).unwrap_err();
            assert!(err.to_string().contains("rotation interval"), "{err}");
        }
        json["rotation_interval"] = serde_json::json!(-1);
        let config: RingConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.rotation_interval, None);
    }

    #[test]
    fn test_draining_capacity_covers_overlap() {
        let config = RingConfig {
            partitions: 3,
            rotation_interval: Some(Duration::from_secs(5)),
            overlap: Duration::from_secs(2),
            max_partition_bytes: 1024,
        };
        assert_eq!(config.draining_capacity(), 1);
        assert_eq!(config.store_count(), 4);

        let long_overlap = RingConfig {
            overlap: Duration::from_secs(12),
            ..config.clone()
        };
        assert_eq!(long_overlap.draining_capacity(), 3);

        let huge_overlap = RingConfig {
            overlap: Duration::from_secs(3600),
            ..config.clone()
        };
        assert_eq!(huge_overlap.draining_capacity(), MAX_DRAINING_STORES);

        let manual = RingConfig {
            rotation_interval: None,
            ..config
        };
        assert_eq!(manual.draining_capacity(), 1);
    }

    #[test]
    fn test_ensure_writable_dir_creates_and_checks() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_writable_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);

        let file = dir.path().join("plain-file");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            ensure_writable_dir(&file),
            Err(BufferError::InvalidConfig { .. })
        ));
    }
}
