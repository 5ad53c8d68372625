use thiserror::Error;

use clo_scheduler::{PayloadError, ScheduledJobType, SchedulerError};

/// Result type for job handlers
pub type JobResult<T> = Result<T, JobError>;

/// Result type for the worker loop and assembly
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Result type for collaborator calls
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Fatal errors raised while building or running a job handler.
///
/// Expected business failures are not errors; they are reported as
/// [`OrchestratedExecutionResult::NonTerminalError`](crate::OrchestratedExecutionResult).
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Invalid payload for {job_type}: {source}")]
    Payload {
        job_type: ScheduledJobType,
        #[source]
        source: PayloadError,
    },

    #[error("No handler registered for job type {0}")]
    NoHandlerRegistered(ScheduledJobType),

    #[error("Handler for job type {0} is already registered")]
    AlreadyRegistered(ScheduledJobType),

    #[error("Handler for {job_type} does not match job record (orchestrated = {orchestrated})")]
    HandlerKindMismatch {
        job_type: ScheduledJobType,
        orchestrated: bool,
    },

    #[error("Collaborator call failed: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Job failed: {0}")]
    Failed(String),
}

impl JobError {
    pub fn payload(job_type: ScheduledJobType, source: PayloadError) -> Self {
        Self::Payload { job_type, source }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Whether the job failed fast because a required payload key is absent
    pub fn is_missing_payload_data(&self) -> bool {
        matches!(self, Self::Payload { source, .. } if source.is_missing_data())
    }
}

/// Transport or storage failure inside a data-access or partner collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{operation} unavailable: {message}")]
    Unavailable { operation: String, message: String },
}

impl CollaboratorError {
    pub fn unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the worker loop and process assembly
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker join error: {0}")]
    Join(String),

    #[error("Worker has stopped")]
    Stopped,
}

/// Errors reading worker configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
        }
    }
}
