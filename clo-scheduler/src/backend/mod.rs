pub mod memory;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;

use crate::{
    ClaimedJob, JobEvent, JobId, Payload, ScheduledJobDetails, ScheduledJobType, SchedulerResult,
};

/// Type alias for boxed streams (stable Rust compatible)
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Durable queue + table contract the worker core depends on.
///
/// Delivery is at-least-once: a claimed job is hidden for a visibility
/// window, and if [`Scheduler::complete_job_iteration`] is not called before
/// the window lapses the job is delivered again.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Validate, persist and enqueue a job for delivery at its start time
    async fn schedule_job(&self, job: ScheduledJobDetails) -> SchedulerResult<ScheduledJobDetails>;

    /// Claim the next eligible job and hide it for the visibility window
    async fn get_job_to_process(&self) -> SchedulerResult<Option<ClaimedJob>>;

    /// Acknowledge a finished run, rescheduling recurring jobs
    async fn complete_job_iteration(&self, claimed: &ClaimedJob) -> SchedulerResult<()>;

    /// Hide a still-running job for `timeout` from now
    async fn increase_visibility_timeout(
        &self,
        claimed: &ClaimedJob,
        timeout: Duration,
    ) -> SchedulerResult<ClaimedJob>;

    /// Change state and recurrence in place without disturbing queue order
    async fn update_job(&self, job: ScheduledJobDetails) -> SchedulerResult<ScheduledJobDetails>;

    /// Replace the payload of a scheduled job
    async fn update_job_payload(&self, job_id: &JobId, payload: Payload) -> SchedulerResult<ScheduledJobDetails>;

    /// Active (running or paused) jobs of a type
    async fn get_all_active_jobs_by_type(
        &self,
        job_type: ScheduledJobType,
    ) -> SchedulerResult<Vec<ScheduledJobDetails>>;

    /// Active jobs of a type carrying the given description
    async fn get_jobs_by_type_and_description(
        &self,
        job_type: ScheduledJobType,
        description: &str,
    ) -> SchedulerResult<Vec<ScheduledJobDetails>>;

    /// Point lookup
    async fn get_job_by_id(&self, job_id: &JobId) -> SchedulerResult<Option<ScheduledJobDetails>>;

    /// Event stream for observability (boxed for stable Rust)
    fn event_stream(&self) -> BoxStream<JobEvent>;
}
