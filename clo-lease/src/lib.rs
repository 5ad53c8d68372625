//! # clo-lease: advisory leases for single-instance work
//!
//! When the worker is scaled out, every instance starts up at the same time
//! and each would seed the recurring jobs. [`ConcurrencyMonitor`] races all of
//! them for one time-boxed lease; the winner runs the action and the others
//! skip it without error.
//!
//! ```rust
//! use std::sync::Arc;
//! use clo_lease::{ConcurrencyMonitor, LeaseConfig, MemoryLeaseStore};
//!
//! # async fn demo() {
//! let store = Arc::new(MemoryLeaseStore::new());
//! let monitor = ConcurrencyMonitor::new(store, LeaseConfig::default());
//!
//! let seeded: Result<Option<usize>, std::io::Error> = monitor
//!     .invoke_with_lease(|| async { Ok(7) })
//!     .await;
//! # }
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod monitor;
pub mod store;

pub use config::{LeaseConfig, DEFAULT_LEASE_BLOB, DEFAULT_LEASE_DURATION};
pub use error::{LeaseError, LeaseResult};
pub use memory::MemoryLeaseStore;
pub use monitor::ConcurrencyMonitor;
pub use store::{LeaseHandle, LeaseStore};
