use serde::{Deserialize, Serialize};
use std::fmt;

/// Latency/completeness tier of a data provider. Ordered fast first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelOfService {
    Fast,
    Medium,
    Slow,
}

impl fmt::Display for LevelOfService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LevelOfService::Fast => "fast",
            LevelOfService::Medium => "medium",
            LevelOfService::Slow => "slow",
        };
        f.write_str(name)
    }
}

/// Backing storage of a buffer ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Disk,
}

impl StorageKind {
    pub fn level_of_service(self) -> LevelOfService {
        match self {
            StorageKind::Memory => LevelOfService::Fast,
            StorageKind::Disk => LevelOfService::Medium,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => f.write_str("memory"),
            StorageKind::Disk => f.write_str("disk"),
        }
    }
}
