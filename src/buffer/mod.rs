//! Rotating, partitioned time-series buffers.
//!
//! A [`BufferRing`] owns a fixed number of partitions (memory or disk). Writes
//! land in the current partition, reads cover the whole ring, and an [`Evictor`]
//! reuses the oldest partition once per rotation interval.

pub mod budget;
pub mod config;
#[cfg(feature = "disk")]
pub mod disk;
pub mod error;
pub mod evictor;
pub mod memory;
pub mod metadata;
pub mod metrics;
pub mod partition;
pub mod registry;
pub mod ring;

pub use budget::{ByteBudget, StoragePressure};
pub use config::{BufferConfig, DEFAULT_DISK_LOCATION, RingConfig, ensure_writable_dir};
#[cfg(feature = "disk")]
pub use disk::DiskPartition;
pub use error::{BufferError, ErrorRecovery};
pub use evictor::Evictor;
pub use memory::MemoryPartition;
pub use metadata::PartitionMetadata;
pub use metrics::{PartitionStats, RingMetrics, RingMetricsCollector, RingStats};
pub use partition::{PartitionStore, TimeSpan};
pub use registry::BufferRegistry;
pub use ring::{BufferRing, MAX_FEED_ID_BYTES, RING_STATE_FILE, validate_record};
