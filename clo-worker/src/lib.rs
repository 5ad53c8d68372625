//! # clo-worker: job processing for the card-linked offer back end
//!
//! The worker claims jobs from a [`Scheduler`](clo_scheduler::Scheduler),
//! resolves a handler through the [`JobRunnerRegistry`] and runs it while a
//! background task keeps the job hidden from other instances. Handlers are
//! either flat tasks or [`OrchestratedJob`]s that fan out into tasks and
//! child jobs.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clo_lease::MemoryLeaseStore;
//! use clo_scheduler::MemoryScheduler;
//! use clo_worker::{app, Collaborators, WorkerConfig};
//!
//! # async fn demo() -> clo_worker::WorkerResult<()> {
//! let config = WorkerConfig::from_env()?;
//! let worker = app::build(
//!     config,
//!     Arc::new(MemoryScheduler::new()),
//!     Arc::new(MemoryLeaseStore::new()),
//!     Collaborators::in_memory(),
//! )
//! .await?;
//!
//! worker.handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod jobs;
pub mod orchestration;
pub mod runner;
pub mod seeding;
pub mod telemetry;
pub mod worker;

pub use collaborators::{
    Collaborators, PayeeType, ReferralOperations, ResultCode, RewardOperations,
    RewardPayoutRecord, RewardPayoutStatus, SettlementFileProcessor,
};
pub use config::{LogFormat, WorkerConfig, MAX_VISIBILITY_TIMEOUT};
pub use error::{
    CollaboratorError, CollaboratorResult, ConfigError, JobError, JobResult, WorkerError,
    WorkerResult,
};
pub use orchestration::{
    execute_orchestrated_job, OrchestratedExecutionResult, OrchestratedJob, OrchestratedTask,
};
pub use runner::{JobHandler, JobRunnerRegistry};
pub use seeding::{seed_recurring_jobs, seed_with_lease, SeedReport};
pub use worker::{Worker, WorkerHandle, WorkerSignal, WorkerState};
