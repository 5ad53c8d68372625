//! Two-level fan-out of a job into tasks and child jobs.
//!
//! An [`OrchestratedJob`] owns a list of [`OrchestratedTask`]s and a list of
//! child jobs. [`execute_orchestrated_job`] runs the start-up hook, then the
//! tasks and children (concurrently, or sequentially in the declared order),
//! then always the tear-down hook with the aggregate result.

pub mod executor;

pub use executor::execute_orchestrated_job;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::JobResult;

/// Outcome of a task, a job, or a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrchestratedExecutionResult {
    Success,

    /// Expected business failure: logged, siblings keep running, and the
    /// iteration still completes
    NonTerminalError,

    /// The run must not be acknowledged; the job is redelivered later
    TerminalError,
}

impl OrchestratedExecutionResult {
    fn severity(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NonTerminalError => 1,
            Self::TerminalError => 2,
        }
    }

    /// Worst of the two results
    pub fn combine(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    /// Worst of all results; `Success` when empty
    pub fn aggregate<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        results.into_iter().fold(Self::Success, Self::combine)
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Whether the scheduler iteration should be acknowledged
    pub fn completes_iteration(self) -> bool {
        self != Self::TerminalError
    }
}

impl std::fmt::Display for OrchestratedExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Success => "Success",
            Self::NonTerminalError => "NonTerminalError",
            Self::TerminalError => "TerminalError",
        };
        write!(f, "{}", name)
    }
}

/// Smallest unit of work.
///
/// Tasks are built from an already decoded payload, so `execute` never has
/// to validate input. Implementations must be safe to run again with the
/// same payload.
#[async_trait]
pub trait OrchestratedTask: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self) -> JobResult<OrchestratedExecutionResult>;
}

/// Job made of tasks and child jobs
#[async_trait]
pub trait OrchestratedJob: Send + Sync {
    fn name(&self) -> &str;

    fn tasks(&self) -> &[Arc<dyn OrchestratedTask>];

    fn child_jobs(&self) -> &[Arc<dyn OrchestratedJob>] {
        &[]
    }

    /// Run every task and child concurrently
    fn asynchronous(&self) -> bool {
        false
    }

    /// In sequential mode, run all tasks before any child job
    fn tasks_first(&self) -> bool {
        true
    }

    /// Pre-condition hook; anything but `Success` skips the body
    async fn start_up(&self) -> JobResult<OrchestratedExecutionResult> {
        Ok(OrchestratedExecutionResult::Success)
    }

    /// Post-condition hook, invoked exactly once per execution
    async fn tear_down(&self, _result: OrchestratedExecutionResult) -> JobResult<()> {
        Ok(())
    }
}
