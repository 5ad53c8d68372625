use std::time::Duration;

/// Blob guarding one-time worker initialization
pub const DEFAULT_LEASE_BLOB: &str = "worker-initialization";

/// Lease length used by the monitor
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(60);

/// Configuration for a [`ConcurrencyMonitor`](crate::ConcurrencyMonitor)
#[derive(Debug, Clone)]
pub struct LeaseConfig {
    /// Name of the blob every instance races for
    pub blob: String,

    /// How long an acquired lease stays valid without release
    pub duration: Duration,
}

impl LeaseConfig {
    pub fn new(blob: impl Into<String>) -> Self {
        Self {
            blob: blob.into(),
            duration: DEFAULT_LEASE_DURATION,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LEASE_BLOB)
    }
}
