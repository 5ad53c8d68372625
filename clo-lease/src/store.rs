use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::LeaseResult;

/// Time-boxed exclusive lease primitives - implemented by every lease backend
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Try to take the lease on `blob` for `duration`.
    ///
    /// Returns `Ok(None)` when another holder has an unexpired lease; this is
    /// the expected outcome when several instances race, not an error.
    async fn try_acquire(&self, blob: &str, duration: Duration) -> LeaseResult<Option<LeaseHandle>>;

    /// Give the lease back before it expires
    async fn release(&self, lease: &LeaseHandle) -> LeaseResult<()>;
}

/// Proof of a held lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseHandle {
    pub blob: String,
    pub lease_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl LeaseHandle {
    pub fn new(blob: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            blob: blob.into(),
            lease_id: Uuid::new_v4(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
