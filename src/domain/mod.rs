//! Domain layer for telemetry-buffer.
//!
//! Contains the canonical types shared across all modules:
//! - `Record` / `Fields`: a timestamped sample of one feed
//! - `TimeUnit`: the unit qualifying timestamps at provider boundaries
//! - `LevelOfService` / `StorageKind`: provider tiers

pub mod record;
pub mod service_level;
pub mod time_unit;

pub use record::{CompletionCallback, FeedBatch, FeedData, Fields, Record, fields};
pub use service_level::{LevelOfService, StorageKind};
pub use time_unit::TimeUnit;
