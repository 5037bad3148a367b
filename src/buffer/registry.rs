use super::config::BufferConfig;
#[cfg(feature = "disk")]
use super::config::ensure_writable_dir;
use super::error::BufferError;
use super::ring::BufferRing;
use crate::domain::StorageKind;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Process-wide owner of the buffer rings: at most one ring per storage kind.
#[derive(Debug)]
pub struct BufferRegistry {
    config: BufferConfig,
    memory_only: bool,
    rings: Mutex<HashMap<StorageKind, Arc<BufferRing>>>,
}

impl BufferRegistry {
    /// Validates `config` and checks that the disk location can be written to.
    pub fn new(config: BufferConfig) -> Result<Self, BufferError> {
        config.validate()?;
        #[cfg(feature = "disk")]
        ensure_writable_dir(&config.disk_location)?;
        Ok(Self {
            config,
            memory_only: false,
            rings: Mutex::new(HashMap::new()),
        })
    }

    /// Registry that never touches the disk location and refuses disk rings.
    pub fn memory_only(config: BufferConfig) -> Result<Self, BufferError> {
        config.validate()?;
        Ok(Self {
            config,
            memory_only: true,
            rings: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Returns the ring of `kind`, building it on first use.
    pub fn get_or_create(&self, kind: StorageKind) -> Result<Arc<BufferRing>, BufferError> {
        let mut rings = self.rings.lock();
        if let Some(ring) = rings.get(&kind) {
            return Ok(ring.clone());
        }

        let ring = Arc::new(self.build(kind)?);
        rings.insert(kind, ring.clone());
        info!("Registered {} ring", kind);
        Ok(ring)
    }

    pub fn get(&self, kind: StorageKind) -> Option<Arc<BufferRing>> {
        self.rings.lock().get(&kind).cloned()
    }

    /// Resets and closes every cached ring, then empties the cache. The next
    /// `get_or_create` builds fresh rings.
    pub fn reset_all(&self) -> Result<(), BufferError> {
        let rings: Vec<Arc<BufferRing>> = self.rings.lock().drain().map(|(_, ring)| ring).collect();
        let mut first_error = None;
        for ring in rings {
            if let Err(e) = ring.reset().and_then(|()| ring.close()) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Closes every cached ring; the cache keeps them for inspection.
    pub fn close_all(&self) -> Result<(), BufferError> {
        let rings: Vec<Arc<BufferRing>> = self.rings.lock().values().cloned().collect();
        let mut first_error = None;
        for ring in rings {
            if let Err(e) = ring.close() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn build(&self, kind: StorageKind) -> Result<BufferRing, BufferError> {
        let config = self.config.ring(kind);
        match kind {
            StorageKind::Memory => BufferRing::memory(config),
            StorageKind::Disk if self.memory_only => Err(BufferError::invalid_config(
                "disk rings are disabled for a memory-only registry",
            )),
            #[cfg(feature = "disk")]
            StorageKind::Disk => BufferRing::disk(config, &self.config.disk_location),
            #[cfg(not(feature = "disk"))]
            StorageKind::Disk => Err(BufferError::invalid_config(
                "disk rings require the `disk` feature",
            )),
        }
    }
}
