use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::{
    backend::{BoxStream, Scheduler},
    clock::{Clock, SystemClock},
    ClaimedJob, JobEvent, JobId, JobState, Payload, PopReceipt, ScheduledJobDetails,
    ScheduledJobType, SchedulerError, SchedulerResult,
};

/// Visibility window applied to every claim
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Table row: the job plus its queue bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JobEntity {
    details: ScheduledJobDetails,

    /// Hidden from claims until this instant
    visible_at: DateTime<Utc>,

    /// Receipt of the current delivery, if any
    receipt: Option<PopReceipt>,

    /// Number of times the job has been claimed
    dequeue_count: u32,
}

/// Rows are kept serialized, the way the durable table stores them
#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<JobId, String>,
    queue: VecDeque<JobId>,
}

impl Tables {
    fn load(&self, job_id: &JobId) -> SchedulerResult<JobEntity> {
        let row = self
            .rows
            .get(job_id)
            .ok_or_else(|| SchedulerError::JobNotFound(job_id.clone()))?;
        Ok(serde_json::from_str(row)?)
    }

    fn store(&mut self, entity: &JobEntity) -> SchedulerResult<()> {
        let row = serde_json::to_string(entity)?;
        self.rows.insert(entity.details.job_id.clone(), row);
        Ok(())
    }

    fn dequeue_id(&mut self, job_id: &JobId) {
        self.queue.retain(|queued| queued != job_id);
    }

    fn requeue_back(&mut self, job_id: &JobId) {
        self.dequeue_id(job_id);
        self.queue.push_back(job_id.clone());
    }

    fn scan(&self) -> SchedulerResult<Vec<ScheduledJobDetails>> {
        let mut jobs = self
            .rows
            .values()
            .map(|row| serde_json::from_str::<JobEntity>(row).map(|entity| entity.details))
            .collect::<Result<Vec<_>, _>>()?;
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        Ok(jobs)
    }
}

/// In-memory scheduler for tests, development and single-process deployments
#[derive(Clone)]
pub struct MemoryScheduler {
    tables: Arc<RwLock<Tables>>,
    clock: Arc<dyn Clock>,
    visibility_timeout: Duration,
    event_broadcaster: broadcast::Sender<JobEvent>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        let (event_broadcaster, _) = broadcast::channel(1000);

        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            clock: Arc::new(SystemClock),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            event_broadcaster,
        }
    }

    /// Use a custom time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a custom visibility window for claims
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    pub fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }

    /// Number of jobs waiting in the queue (claimed ones included)
    pub fn queue_len(&self) -> usize {
        self.tables.read().queue.len()
    }

    fn emit(&self, event: JobEvent) {
        let _ = self.event_broadcaster.send(event);
    }

    /// End of a visibility window opened at `now`
    fn visible_until(now: DateTime<Utc>, timeout: Duration) -> SchedulerResult<DateTime<Utc>> {
        chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| SchedulerError::validation(format!("visibility timeout {:?} is out of range", timeout)))
    }

    fn check_receipt(entity: &JobEntity, claimed: &ClaimedJob) -> SchedulerResult<()> {
        if entity.details.job_state.is_terminal() {
            return Err(SchedulerError::JobAlreadyTerminal {
                job_id: entity.details.job_id.clone(),
                state: entity.details.job_state,
            });
        }
        if entity.receipt.as_ref() != Some(&claimed.receipt) {
            return Err(SchedulerError::InvalidReceipt(entity.details.job_id.clone()));
        }
        Ok(())
    }

    fn check_mutable(entity: &JobEntity) -> SchedulerResult<()> {
        if entity.details.job_state.is_terminal() {
            return Err(SchedulerError::JobAlreadyTerminal {
                job_id: entity.details.job_id.clone(),
                state: entity.details.job_state,
            });
        }
        Ok(())
    }
}

impl Default for MemoryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for MemoryScheduler {
    #[instrument(skip(self, job), fields(job_id = %job.job_id, job_type = %job.job_type))]
    async fn schedule_job(&self, mut job: ScheduledJobDetails) -> SchedulerResult<ScheduledJobDetails> {
        job.validate_for_schedule()?;

        let now = self.clock.now();
        job.job_state = JobState::RUNNING;
        job.version = 1;
        job.run_count = 0;
        job.last_run_time = None;

        {
            let mut tables = self.tables.write();
            if tables.rows.contains_key(&job.job_id) {
                return Err(SchedulerError::JobAlreadyExists(job.job_id));
            }

            let entity = JobEntity {
                details: job.clone(),
                visible_at: now,
                receipt: None,
                dequeue_count: 0,
            };
            tables.store(&entity)?;
            tables.queue.push_back(job.job_id.clone());
        }

        self.emit(JobEvent::Scheduled {
            job_id: job.job_id.clone(),
            job_type: job.job_type,
            start_time: job.start_time,
            at: now,
        });

        info!(start_time = ?job.start_time, "Scheduled job");
        Ok(job)
    }

    async fn get_job_to_process(&self) -> SchedulerResult<Option<ClaimedJob>> {
        let now = self.clock.now();
        let visible_until = Self::visible_until(now, self.visibility_timeout)?;

        let claimed = {
            let mut tables = self.tables.write();
            let mut stale = Vec::new();
            let mut claimed = None;

            for job_id in tables.queue.iter() {
                let entity = tables.load(job_id)?;
                let state = entity.details.job_state;

                if state.is_terminal() {
                    stale.push(job_id.clone());
                    continue;
                }
                if state == JobState::RUNNING && entity.details.is_due(now) && entity.visible_at <= now {
                    claimed = Some(entity);
                    break;
                }
            }

            for job_id in &stale {
                tables.dequeue_id(job_id);
            }

            match claimed {
                Some(mut entity) => {
                    let redelivery = entity.receipt.is_some();
                    let receipt = PopReceipt::new();

                    entity.receipt = Some(receipt.clone());
                    entity.visible_at = visible_until;
                    entity.dequeue_count += 1;
                    tables.store(&entity)?;

                    Some((
                        ClaimedJob {
                            job: entity.details,
                            receipt,
                            visible_until,
                        },
                        redelivery,
                    ))
                }
                None => None,
            }
        };

        let Some((claimed, redelivery)) = claimed else {
            return Ok(None);
        };

        if redelivery {
            warn!(
                job_id = %claimed.job.job_id,
                job_type = %claimed.job.job_type,
                "Redelivering job whose visibility window lapsed"
            );
        } else {
            debug!(job_id = %claimed.job.job_id, job_type = %claimed.job.job_type, "Claimed job");
        }

        self.emit(JobEvent::Claimed {
            job_id: claimed.job.job_id.clone(),
            visible_until: claimed.visible_until,
            redelivery,
            at: now,
        });

        Ok(Some(claimed))
    }

    #[instrument(skip(self, claimed), fields(job_id = %claimed.job.job_id, job_type = %claimed.job.job_type))]
    async fn complete_job_iteration(&self, claimed: &ClaimedJob) -> SchedulerResult<()> {
        let now = self.clock.now();

        let event = {
            let mut tables = self.tables.write();
            let mut entity = tables.load(claimed.job_id())?;
            Self::check_receipt(&entity, claimed)?;

            let details = &mut entity.details;
            details.run_count += 1;
            details.last_run_time = Some(now);
            details.version += 1;
            entity.receipt = None;
            entity.visible_at = now;

            let recurrence = details.effective_recurrence();
            let next_start_time = if recurrence.is_exhausted(details.run_count) {
                None
            } else {
                recurrence.next_start_time(now)
            };

            let job_id = details.job_id.clone();
            let run_count = details.run_count;

            match next_start_time {
                Some(next_start_time) => {
                    details.start_time = Some(next_start_time);
                    tables.store(&entity)?;
                    tables.requeue_back(&job_id);
                    JobEvent::IterationCompleted {
                        job_id,
                        run_count,
                        next_start_time,
                        at: now,
                    }
                }
                None => {
                    details.job_state = JobState::COMPLETED;
                    tables.store(&entity)?;
                    tables.dequeue_id(&job_id);
                    JobEvent::Completed {
                        job_id,
                        run_count,
                        at: now,
                    }
                }
            }
        };

        match &event {
            JobEvent::IterationCompleted { next_start_time, run_count, .. } => {
                info!(%next_start_time, run_count, "Completed iteration, job rescheduled")
            }
            _ => info!("Completed job"),
        }

        self.emit(event);
        Ok(())
    }

    async fn increase_visibility_timeout(
        &self,
        claimed: &ClaimedJob,
        timeout: Duration,
    ) -> SchedulerResult<ClaimedJob> {
        let now = self.clock.now();
        let visible_until = Self::visible_until(now, timeout)?;

        {
            let mut tables = self.tables.write();
            let mut entity = tables.load(claimed.job_id())?;
            Self::check_receipt(&entity, claimed)?;

            entity.visible_at = visible_until;
            tables.store(&entity)?;
        }

        debug!(job_id = %claimed.job.job_id, %visible_until, "Extended visibility");

        self.emit(JobEvent::VisibilityExtended {
            job_id: claimed.job.job_id.clone(),
            visible_until,
            at: now,
        });

        Ok(ClaimedJob {
            job: claimed.job.clone(),
            receipt: claimed.receipt.clone(),
            visible_until,
        })
    }

    #[instrument(skip(self, job), fields(job_id = %job.job_id, job_state = %job.job_state))]
    async fn update_job(&self, job: ScheduledJobDetails) -> SchedulerResult<ScheduledJobDetails> {
        job.validate_for_update()?;
        let now = self.clock.now();

        let updated = {
            let mut tables = self.tables.write();
            let mut entity = tables.load(&job.job_id)?;
            Self::check_mutable(&entity)?;

            if entity.details.version != job.version {
                return Err(SchedulerError::VersionConflict {
                    job_id: job.job_id,
                    expected: job.version,
                    found: entity.details.version,
                });
            }

            entity.details.job_state = job.job_state;
            entity.details.recurrence = job.recurrence;
            entity.details.version += 1;
            tables.store(&entity)?;

            if entity.details.job_state.is_terminal() {
                tables.dequeue_id(&entity.details.job_id);
            }
            entity.details
        };

        self.emit(JobEvent::Updated {
            job_id: updated.job_id.clone(),
            version: updated.version,
            at: now,
        });

        info!(version = updated.version, "Updated job");
        Ok(updated)
    }

    async fn update_job_payload(&self, job_id: &JobId, payload: Payload) -> SchedulerResult<ScheduledJobDetails> {
        let now = self.clock.now();

        let updated = {
            let mut tables = self.tables.write();
            let mut entity = tables.load(job_id)?;
            Self::check_mutable(&entity)?;

            entity.details.payload = payload;
            entity.details.version += 1;
            tables.store(&entity)?;
            entity.details
        };

        self.emit(JobEvent::Updated {
            job_id: updated.job_id.clone(),
            version: updated.version,
            at: now,
        });

        debug!(%job_id, version = updated.version, "Updated job payload");
        Ok(updated)
    }

    async fn get_all_active_jobs_by_type(
        &self,
        job_type: ScheduledJobType,
    ) -> SchedulerResult<Vec<ScheduledJobDetails>> {
        let jobs = self.tables.read().scan()?;
        Ok(jobs
            .into_iter()
            .filter(|job| job.job_type == job_type && job.job_state.is_active())
            .collect())
    }

    async fn get_jobs_by_type_and_description(
        &self,
        job_type: ScheduledJobType,
        description: &str,
    ) -> SchedulerResult<Vec<ScheduledJobDetails>> {
        let jobs = self.get_all_active_jobs_by_type(job_type).await?;
        Ok(jobs
            .into_iter()
            .filter(|job| job.job_description.as_deref() == Some(description))
            .collect())
    }

    async fn get_job_by_id(&self, job_id: &JobId) -> SchedulerResult<Option<ScheduledJobDetails>> {
        let tables = self.tables.read();
        match tables.load(job_id) {
            Ok(entity) => Ok(Some(entity.details)),
            Err(SchedulerError::JobNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn event_stream(&self) -> BoxStream<JobEvent> {
        let receiver = self.event_broadcaster.subscribe();
        use tokio_stream::{wrappers::BroadcastStream, StreamExt};
        let stream = BroadcastStream::new(receiver).filter_map(|result| result.ok());

        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::{JobPayload, PartnerFilePayload, Recurrence};
    use tracing_test::traced_test;

    fn pipeline_job() -> ScheduledJobDetails {
        ScheduledJobDetails::new(JobPayload::PartnerFile(PartnerFilePayload::new(
            ScheduledJobType::ProcessMasterCardClearing,
        )))
    }

    fn scheduler_at(clock: &Arc<ManualClock>) -> MemoryScheduler {
        MemoryScheduler::new().with_clock(clock.clone())
    }

    #[tokio::test]
    async fn test_schedule_assigns_state_and_version() {
        let scheduler = MemoryScheduler::new();

        let stored = scheduler.schedule_job(pipeline_job()).await.unwrap();
        assert_eq!(stored.job_state, JobState::RUNNING);
        assert_eq!(stored.version, 1);

        let duplicate = scheduler.schedule_job(pipeline_job().with_job_id(stored.job_id.clone())).await;
        assert!(matches!(duplicate, Err(SchedulerError::JobAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_claim_hides_job() {
        let scheduler = MemoryScheduler::new();
        let stored = scheduler.schedule_job(pipeline_job()).await.unwrap();

        let claimed = scheduler.get_job_to_process().await.unwrap().unwrap();
        assert_eq!(claimed.job.job_id, stored.job_id);
        assert!(scheduler.get_job_to_process().await.unwrap().is_none());
    }

    #[traced_test]
    #[tokio::test]
    async fn test_stale_receipt_rejected_after_redelivery() {
        let clock = Arc::new(ManualClock::starting_now());
        let scheduler = scheduler_at(&clock);
        scheduler.schedule_job(pipeline_job()).await.unwrap();

        let first = scheduler.get_job_to_process().await.unwrap().unwrap();
        clock.advance(chrono::Duration::seconds(61));
        let second = scheduler.get_job_to_process().await.unwrap().unwrap();
        assert_ne!(first.receipt, second.receipt);
        assert!(logs_contain("Redelivering job whose visibility window lapsed"));

        let result = scheduler.complete_job_iteration(&first).await;
        assert!(matches!(result, Err(SchedulerError::InvalidReceipt(_))));
        scheduler.complete_job_iteration(&second).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let scheduler = MemoryScheduler::new();
        let mut stored = scheduler
            .schedule_job(pipeline_job().with_recurrence(Recurrence::hourly()))
            .await
            .unwrap();

        stored.job_state = JobState::PAUSED;
        let updated = scheduler.update_job(stored.clone()).await.unwrap();
        assert_eq!(updated.version, 2);

        let stale = scheduler.update_job(stored).await;
        assert!(matches!(stale, Err(SchedulerError::VersionConflict { expected: 1, found: 2, .. })));
    }

    #[tokio::test]
    async fn test_paused_job_is_not_delivered() {
        let scheduler = MemoryScheduler::new();
        let mut stored = scheduler
            .schedule_job(pipeline_job().with_recurrence(Recurrence::hourly()))
            .await
            .unwrap();

        stored.job_state = JobState::PAUSED;
        let mut paused = scheduler.update_job(stored).await.unwrap();
        assert!(scheduler.get_job_to_process().await.unwrap().is_none());

        paused.job_state = JobState::RUNNING;
        scheduler.update_job(paused).await.unwrap();
        assert!(scheduler.get_job_to_process().await.unwrap().is_some());
    }
}
