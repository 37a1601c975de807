//! Passive expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::session::store::SessionStore;

/// Periodically delete expired records until shutdown is signalled.
pub fn spawn_cleanup(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match store.delete_expired().await {
                        Ok(0) => {}
                        Ok(removed) => {
                            tracing::debug!(removed, "Swept expired sessions");
                            metrics::record_sessions_swept(removed);
                        }
                        Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Session sweeper stopping");
                    break;
                }
            }
        }
    })
}
