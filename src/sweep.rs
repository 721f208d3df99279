//! Background expiry sweep
//!
//! Lookups already ignore expired batches; this task additionally drops them
//! on an interval so signatures that are never requested again do not keep
//! their batches alive.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cache::QuestionCache;

/// Default interval between sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Handle for controlling the background sweep
pub struct SweepHandle {
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl SweepHandle {
    /// Spawns the sweep task
    ///
    /// # Arguments
    /// * `cache` - Store to purge
    /// * `interval` - Time between sweeps; must be non-zero
    pub fn spawn(cache: Arc<dyn QuestionCache>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the first tick (immediate)
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.purge_expired();
                        if removed > 0 {
                            info!(removed = removed, remaining = cache.len(), "Purged expired cache entries");
                        } else {
                            debug!(remaining = cache.len(), "Cache sweep found nothing to purge");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self { shutdown_tx }
    }

    /// Stops the sweep task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
