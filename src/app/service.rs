use super::ConfigError;
use crate::aggregator::FeedAggregator;
use crate::buffer::{BufferConfig, BufferError, BufferRegistry, BufferRing, Evictor};
use crate::domain::{FeedData, StorageKind, TimeUnit};
use crate::parser::{ParsedRecord, RecordParser};
use crate::port::DataArchive;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Buffer error: {0}")]
    BufferError(#[from] BufferError),
    #[error("Input error: {0}")]
    InputError(#[from] std::io::Error),
    #[error("Service already running")]
    AlreadyRunning,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: u64,
    pub rejected: u64,
}

/// The buffer rings, their evictors and the aggregator in front of them.
pub struct FeedService {
    registry: BufferRegistry,
    aggregator: Arc<FeedAggregator>,
    rings: Vec<Arc<BufferRing>>,
    evictors: Vec<Evictor>,
    feeds: Mutex<BTreeSet<String>>,
    shutdown_token: CancellationToken,
}

impl FeedService {
    pub fn new(
        config: BufferConfig,
        memory_only: bool,
        shutdown_token: CancellationToken,
    ) -> Result<Self, ServiceError> {
        let registry = if memory_only {
            BufferRegistry::memory_only(config)?
        } else {
            BufferRegistry::new(config)?
        };

        let mut kinds = vec![StorageKind::Memory];
        if !memory_only {
            kinds.push(StorageKind::Disk);
        }

        let mut rings = Vec::with_capacity(kinds.len());
        for kind in kinds {
            rings.push(registry.get_or_create(kind)?);
        }

        let aggregator = Arc::new(FeedAggregator::with_archives(
            rings.iter().map(|ring| ring.clone() as Arc<dyn DataArchive>),
        ));

        Ok(Self {
            registry,
            aggregator,
            rings,
            evictors: Vec::new(),
            feeds: Mutex::new(BTreeSet::new()),
            shutdown_token,
        })
    }

    /// Spawns one evictor per ring that rotates automatically.
    pub fn start(&mut self) -> Result<(), ServiceError> {
        if !self.evictors.is_empty() {
            return Err(ServiceError::AlreadyRunning);
        }
        self.evictors = self
            .rings
            .iter()
            .filter_map(|ring| Evictor::start(ring.clone(), self.shutdown_token.clone()))
            .collect();
        info!(
            "Feed service started with {} rings ({} rotating)",
            self.rings.len(),
            self.evictors.len()
        );
        Ok(())
    }

    pub fn aggregator(&self) -> Arc<FeedAggregator> {
        self.aggregator.clone()
    }

    pub fn registry(&self) -> &BufferRegistry {
        &self.registry
    }

    pub fn ring(&self, kind: StorageKind) -> Option<Arc<BufferRing>> {
        self.rings.iter().find(|ring| ring.kind() == kind).cloned()
    }

    /// Feed ids seen by [`FeedService::ingest`] so far.
    pub fn known_feeds(&self) -> Vec<String> {
        self.feeds.lock().iter().cloned().collect()
    }

    pub fn ingest(&self, parsed: &ParsedRecord) -> Result<(), BufferError> {
        let record = &parsed.record;
        self.aggregator
            .put(&record.feed_id, parsed.unit, record.timestamp, &record.fields)?;
        let mut feeds = self.feeds.lock();
        if !feeds.contains(&record.feed_id) {
            feeds.insert(record.feed_id.clone());
        }
        Ok(())
    }

    /// Reads NDJSON records until EOF or shutdown. Bad lines are logged and
    /// counted; they never stop ingestion.
    pub async fn ingest_lines<R>(&self, reader: R, parser: &RecordParser) -> Result<IngestReport, ServiceError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut report = IngestReport::default();

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested, stopping ingestion");
                    break;
                }
            };
            let Some(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let outcome = parser
                .parse_line(&line)
                .map_err(BufferError::from)
                .and_then(|parsed| self.ingest(&parsed));
            match outcome {
                Ok(()) => report.accepted += 1,
                Err(BufferError::MalformedRecord { reason }) => {
                    warn!("Skipping malformed line: {}", reason);
                    report.rejected += 1;
                }
                Err(e) => {
                    error!("Failed to buffer record: {}", e);
                    report.rejected += 1;
                }
            }
        }

        info!(
            "Ingestion finished: {} accepted, {} rejected",
            report.accepted, report.rejected
        );
        Ok(report)
    }

    /// Everything currently buffered for the known feeds.
    pub fn snapshot(&self, unit: TimeUnit) -> FeedData {
        self.aggregator
            .get(&self.known_feeds(), unit, i64::MIN, i64::MAX)
    }

    /// Stops the evictors and closes every ring.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        self.shutdown_token.cancel();
        for evictor in self.evictors {
            evictor.stop().await;
        }
        self.registry.close_all()?;
        info!("Feed service stopped");
        Ok(())
    }
}
