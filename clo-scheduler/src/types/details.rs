use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JobId, JobState, PopReceipt, Recurrence, ScheduledJobType};
use crate::codec::{JobPayload, Payload};
use crate::error::{PayloadError, SchedulerError, SchedulerResult};

/// Durable description of a unit of scheduled work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJobDetails {
    /// Unique job identifier, immutable once scheduled
    pub job_id: JobId,

    /// Handler selector
    pub job_type: ScheduledJobType,

    /// Correlation label (user ID, pipeline name) for idempotent lookups
    pub job_description: Option<String>,

    /// Whether the job runs through the orchestrated job tree
    pub orchestrated: bool,

    /// Rescheduling policy; absent means run once
    pub recurrence: Option<Recurrence>,

    /// Earliest time the job may be delivered; absent means as soon as possible
    pub start_time: Option<DateTime<Utc>>,

    /// Server-assigned state
    pub job_state: JobState,

    /// Handler parameters
    pub payload: Payload,

    /// Optimistic concurrency counter, server-assigned
    pub version: u64,

    /// Completed iterations, server-maintained
    pub run_count: u32,

    /// Completion time of the last iteration, server-maintained
    pub last_run_time: Option<DateTime<Utc>>,
}

impl ScheduledJobDetails {
    /// Create a job from a typed payload; type, orchestration and payload
    /// map are all derived from the record
    pub fn new(payload: JobPayload) -> Self {
        let job_type = payload.job_type();
        Self::for_type(job_type, payload.encode())
    }

    /// Create a job from a raw payload map
    pub fn for_type(job_type: ScheduledJobType, payload: Payload) -> Self {
        Self {
            job_id: JobId::new(),
            job_type,
            job_description: None,
            orchestrated: job_type.is_orchestrated(),
            recurrence: None,
            start_time: None,
            job_state: JobState::NOT_SPECIFIED,
            payload,
            version: 0,
            run_count: 0,
            last_run_time: None,
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<JobId>) -> Self {
        self.job_id = job_id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.job_description = Some(description.into());
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Recurrence in effect, defaulting to a single run
    pub fn effective_recurrence(&self) -> Recurrence {
        self.recurrence.unwrap_or_default()
    }

    /// Whether the job may be delivered at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.start_time.map_or(true, |start| start <= now)
    }

    /// Decode the payload map into the typed record for this job type
    pub fn decode_payload(&self) -> Result<JobPayload, PayloadError> {
        JobPayload::decode(self.job_type, &self.payload)
    }

    /// Invariants a producer must satisfy when scheduling
    pub fn validate_for_schedule(&self) -> SchedulerResult<()> {
        if self.job_id.is_blank() {
            return Err(SchedulerError::validation("job id must not be empty"));
        }
        if self.job_state != JobState::NOT_SPECIFIED {
            return Err(SchedulerError::validation(format!(
                "job state must be not_specified when scheduling, found {}",
                self.job_state
            )));
        }
        if let Some(recurrence) = &self.recurrence {
            recurrence.validate()?;
        }
        Ok(())
    }

    /// Invariants an update must satisfy
    pub fn validate_for_update(&self) -> SchedulerResult<()> {
        if self.job_id.is_blank() {
            return Err(SchedulerError::validation("job id must not be empty"));
        }
        if self.job_state == JobState::NOT_SPECIFIED || self.job_state == JobState::COMPLETED {
            return Err(SchedulerError::validation(format!(
                "job state cannot be set to {} by an update",
                self.job_state
            )));
        }
        if ![JobState::RUNNING, JobState::PAUSED, JobState::CANCELED].contains(&self.job_state) {
            return Err(SchedulerError::validation(format!(
                "job state {} is a query mask, not a state",
                self.job_state
            )));
        }
        match &self.recurrence {
            Some(recurrence) => recurrence.validate(),
            None => Err(SchedulerError::validation("update must carry a recurrence")),
        }
    }
}

/// A job claimed by [`crate::Scheduler::get_job_to_process`]
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    /// Job snapshot at claim time
    pub job: ScheduledJobDetails,

    /// Receipt proving ownership of this delivery
    pub receipt: PopReceipt,

    /// When the job becomes visible to other workers again
    pub visible_until: DateTime<Utc>,
}

impl ClaimedJob {
    pub fn job_id(&self) -> &JobId {
        &self.job.job_id
    }

    pub fn job_type(&self) -> ScheduledJobType {
        self.job.job_type
    }

    /// Check if the visibility window is still open
    pub fn is_hidden(&self, now: DateTime<Utc>) -> bool {
        self.visible_until > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PartnerFilePayload;
    use crate::types::RecurrenceFrequency;

    fn pipeline_job() -> ScheduledJobDetails {
        ScheduledJobDetails::new(JobPayload::PartnerFile(PartnerFilePayload::new(
            ScheduledJobType::ProcessAmexStatement,
        )))
    }

    #[test]
    fn test_new_derives_type_and_orchestration() {
        let job = pipeline_job();
        assert_eq!(job.job_type, ScheduledJobType::ProcessAmexStatement);
        assert!(!job.orchestrated);
        assert_eq!(job.job_state, JobState::NOT_SPECIFIED);
        assert!(job.validate_for_schedule().is_ok());
    }

    #[test]
    fn test_schedule_rejects_blank_id_and_preset_state() {
        let job = pipeline_job().with_job_id("  ");
        assert!(matches!(job.validate_for_schedule(), Err(SchedulerError::Validation(_))));

        let mut job = pipeline_job();
        job.job_state = JobState::RUNNING;
        assert!(job.validate_for_schedule().is_err());

        let job = pipeline_job().with_recurrence(Recurrence::every(RecurrenceFrequency::Hour, 0));
        assert!(job.validate_for_schedule().is_err());
    }

    #[test]
    fn test_update_rules() {
        let mut job = pipeline_job().with_recurrence(Recurrence::hourly());
        job.job_state = JobState::PAUSED;
        assert!(job.validate_for_update().is_ok());

        job.job_state = JobState::COMPLETED;
        assert!(job.validate_for_update().is_err());

        job.job_state = JobState::NOT_SPECIFIED;
        assert!(job.validate_for_update().is_err());

        job.job_state = JobState::ALL;
        assert!(job.validate_for_update().is_err());

        job.job_state = JobState::RUNNING;
        job.recurrence = None;
        assert!(job.validate_for_update().is_err());
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        assert!(pipeline_job().is_due(now));
        assert!(!pipeline_job()
            .with_start_time(now + chrono::Duration::minutes(5))
            .is_due(now));
    }
}
