use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JobId, ScheduledJobType};

/// Scheduler lifecycle events for structured observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobEvent {
    /// Job was persisted and enqueued
    Scheduled {
        job_id: JobId,
        job_type: ScheduledJobType,
        start_time: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },

    /// Job was claimed by a worker
    Claimed {
        job_id: JobId,
        visible_until: DateTime<Utc>,
        redelivery: bool,
        at: DateTime<Utc>,
    },

    /// Visibility window of a running job was extended
    VisibilityExtended {
        job_id: JobId,
        visible_until: DateTime<Utc>,
        at: DateTime<Utc>,
    },

    /// Recurring job finished an iteration and was re-enqueued
    IterationCompleted {
        job_id: JobId,
        run_count: u32,
        next_start_time: DateTime<Utc>,
        at: DateTime<Utc>,
    },

    /// Job reached the completed state
    Completed {
        job_id: JobId,
        run_count: u32,
        at: DateTime<Utc>,
    },

    /// Job state, recurrence or payload was changed in place
    Updated {
        job_id: JobId,
        version: u64,
        at: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Scheduled { .. } => "scheduled",
            Self::Claimed { .. } => "claimed",
            Self::VisibilityExtended { .. } => "visibility_extended",
            Self::IterationCompleted { .. } => "iteration_completed",
            Self::Completed { .. } => "completed",
            Self::Updated { .. } => "updated",
        }
    }

    /// Get the job ID from any event
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Scheduled { job_id, .. }
            | Self::Claimed { job_id, .. }
            | Self::VisibilityExtended { job_id, .. }
            | Self::IterationCompleted { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Updated { job_id, .. } => job_id,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Scheduled { at, .. }
            | Self::Claimed { at, .. }
            | Self::VisibilityExtended { at, .. }
            | Self::IterationCompleted { at, .. }
            | Self::Completed { at, .. }
            | Self::Updated { at, .. } => at,
        }
    }
}
