//! Background rotation of a buffer ring.
//!
//! One task per ring prepares the next partition and advances the current
//! pointer once per rotation interval. A failed tick is logged and retried on the
//! next tick; the ring keeps serving reads and writes from its current partition.

use super::error::BufferError;
use super::ring::BufferRing;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Handle of a running rotation task.
#[derive(Debug)]
pub struct Evictor {
    handle: JoinHandle<()>,
    shutdown_token: CancellationToken,
}

impl Evictor {
    /// Spawn the rotation task. The first rotation happens one `period` from now.
    ///
    /// The task stops when `shutdown_token` (or the handle via [`Evictor::stop`]) is
    /// cancelled.
    #[must_use]
    pub fn spawn(ring: Arc<BufferRing>, period: Duration, shutdown_token: CancellationToken) -> Self {
        let token = shutdown_token.child_token();
        let handle = tokio::spawn(rotation_loop(ring, period, token.clone()));
        Self {
            handle,
            shutdown_token: token,
        }
    }

    /// Spawns an evictor when the ring has a rotation interval; rings configured
    /// with `-1` only rotate by hand.
    pub fn start(ring: Arc<BufferRing>, shutdown_token: CancellationToken) -> Option<Self> {
        match ring.rotation_interval() {
            Some(period) => Some(Self::spawn(ring, period, shutdown_token)),
            None => {
                info!("Automatic rotation disabled for {} ring", ring.kind());
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn stop(self) {
        self.shutdown_token.cancel();
        if let Err(e) = self.handle.await {
            error!("Rotation task ended abnormally: {}", e);
        }
    }
}

async fn rotation_loop(ring: Arc<BufferRing>, period: Duration, shutdown_token: CancellationToken) {
    let mut rotation_interval = tokio::time::interval_at(Instant::now() + period, period);
    rotation_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Rotation task started for {} ring (interval={:?}, overlap={:?})",
        ring.kind(),
        period,
        ring.overlap()
    );

    loop {
        tokio::select! {
            _ = rotation_interval.tick() => {
                if let Err(e) = tick(&ring) {
                    match e {
                        BufferError::RotationDeferred { .. } => warn!("{} ring: {}", ring.kind(), e),
                        _ => error!("Rotation of {} ring failed: {}", ring.kind(), e),
                    }
                }
            }

            () = shutdown_token.cancelled() => {
                break;
            }
        }
    }

    info!("Rotation task stopped for {} ring", ring.kind());
}

/// One scheduler step: prepare the next partition, then rotate into it.
///
/// A panic inside the ring is contained here so the task survives to the next
/// tick.
pub fn tick(ring: &BufferRing) -> Result<usize, BufferError> {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let prepared = ring.prepare_next()?;
        debug!("{} ring prepared partition {}", ring.kind(), prepared);
        ring.rotate()
    }));

    match outcome {
        Ok(result) => result,
        Err(panic) => {
            let details = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(BufferError::Storage {
                partition: ring.current_partition_index(),
                details: format!("rotation panicked: {details}"),
            })
        }
    }
}
