use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::{LeaseConfig, LeaseStore};

/// Runs an action on at most one instance at a time.
///
/// Acquisition is attempted once. Losing the race, or failing to reach the
/// lease store at all, skips the action silently; nothing is queued or
/// retried.
#[derive(Clone)]
pub struct ConcurrencyMonitor {
    store: Arc<dyn LeaseStore>,
    config: LeaseConfig,
}

impl ConcurrencyMonitor {
    pub fn new(store: Arc<dyn LeaseStore>, config: LeaseConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LeaseConfig {
        &self.config
    }

    /// Run `action` while holding the lease.
    ///
    /// Returns `Ok(None)` when the action was skipped and `Ok(Some(_))` with
    /// its output when it ran. Errors from the action are returned as-is after
    /// the lease has been released.
    pub async fn invoke_with_lease<F, Fut, T, E>(&self, action: F) -> Result<Option<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let blob = self.config.blob.as_str();

        let lease = match self.store.try_acquire(blob, self.config.duration).await {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                info!(blob, "Lease held by another instance, skipping");
                return Ok(None);
            }
            Err(e) => {
                warn!(blob, error = %e, "Could not acquire lease, skipping");
                return Ok(None);
            }
        };

        info!(blob, lease_id = %lease.lease_id, "Acquired lease");
        let outcome = action().await;

        // An unreleased lease lapses on its own after the configured duration
        if let Err(e) = self.store.release(&lease).await {
            warn!(blob, lease_id = %lease.lease_id, error = %e, "Failed to release lease");
        }

        outcome.map(Some)
    }
}

impl std::fmt::Debug for ConcurrencyMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyMonitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
