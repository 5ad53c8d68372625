use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use crate::{LeaseError, LeaseHandle, LeaseResult, LeaseStore};

/// In-process lease store.
///
/// Clones share the same lease table, so handing a clone to each monitor
/// models several worker instances racing for one storage account.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaseStore {
    leases: Arc<Mutex<HashMap<String, LeaseHandle>>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `blob` currently has an unexpired lease
    pub fn is_leased(&self, blob: &str) -> bool {
        let now = Utc::now();
        self.leases
            .lock()
            .get(blob)
            .map_or(false, |lease| !lease.is_expired(now))
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn try_acquire(&self, blob: &str, duration: Duration) -> LeaseResult<Option<LeaseHandle>> {
        if blob.is_empty() {
            return Err(LeaseError::invalid("blob name must not be empty"));
        }
        let duration = chrono::Duration::from_std(duration)
            .map_err(|_| LeaseError::invalid(format!("lease duration {:?} is out of range", duration)))?;

        let now = Utc::now();
        let mut leases = self.leases.lock();

        if let Some(current) = leases.get(blob) {
            if !current.is_expired(now) {
                debug!(blob, expires_at = %current.expires_at, "Lease held elsewhere");
                return Ok(None);
            }
        }

        let lease = LeaseHandle::new(blob, now + duration);
        leases.insert(blob.to_string(), lease.clone());
        debug!(blob, lease_id = %lease.lease_id, "Acquired lease");
        Ok(Some(lease))
    }

    async fn release(&self, lease: &LeaseHandle) -> LeaseResult<()> {
        let mut leases = self.leases.lock();
        match leases.get(&lease.blob) {
            Some(current) if current.lease_id == lease.lease_id => {
                leases.remove(&lease.blob);
                debug!(blob = %lease.blob, lease_id = %lease.lease_id, "Released lease");
                Ok(())
            }
            _ => Err(LeaseError::not_held(&lease.blob, lease.lease_id)),
        }
    }
}
