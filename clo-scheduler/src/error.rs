use thiserror::Error;

use crate::types::{JobId, JobState, ScheduledJobType};

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Infrastructure errors for scheduler operations
#[derive(Error, Debug, Clone)]
pub enum SchedulerError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Job already scheduled: {0}")]
    JobAlreadyExists(JobId),

    #[error("Invalid job: {0}")]
    Validation(String),

    #[error("Invalid pop receipt for job {0}")]
    InvalidReceipt(JobId),

    #[error("Version conflict for job {job_id}: expected {expected}, found {found}")]
    VersionConflict {
        job_id: JobId,
        expected: u64,
        found: u64,
    },

    #[error("Job {job_id} is in terminal state {state}")]
    JobAlreadyTerminal { job_id: JobId, state: JobState },

    #[error("Invalid payload for {job_type}: {source}")]
    Payload {
        job_type: ScheduledJobType,
        #[source]
        source: PayloadError,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SchedulerError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors raised while extracting a typed record from a job payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// A key the handler requires is absent
    #[error("Job payload missing data: {key}")]
    JobPayloadMissingData { key: String },

    /// A key is present but its value does not parse
    #[error("Job payload value for {key} is malformed: {value:?}")]
    Malformed { key: String, value: String },

    /// The job type has no payload record
    #[error("Job type {0} does not carry a typed payload")]
    UnexpectedJobType(ScheduledJobType),
}

impl PayloadError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::JobPayloadMissingData { key: key.into() }
    }

    pub fn malformed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::JobPayloadMissingData { .. })
    }
}
