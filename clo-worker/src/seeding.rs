use tracing::{info, instrument};

use clo_lease::ConcurrencyMonitor;
use clo_scheduler::{
    JobId, JobPayload, PartnerFilePayload, Recurrence, ScheduledJobDetails, ScheduledJobType,
    Scheduler, SchedulerError, SchedulerResult,
};

/// What a seeding pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub scheduled: Vec<(ScheduledJobType, JobId)>,
    pub skipped: Vec<ScheduledJobType>,
}

/// Schedule one recurring job per partner file pipeline.
///
/// A pipeline that already has an active job is left alone, so running this
/// again is a no-op.
#[instrument(skip(scheduler, pipelines))]
pub async fn seed_recurring_jobs(
    scheduler: &dyn Scheduler,
    pipelines: &[ScheduledJobType],
    interval_minutes: u32,
) -> SchedulerResult<SeedReport> {
    let mut report = SeedReport::default();

    for &pipeline in pipelines {
        if !pipeline.is_partner_file_pipeline() {
            return Err(SchedulerError::validation(format!(
                "{} is not a partner file pipeline",
                pipeline
            )));
        }

        let active = scheduler.get_all_active_jobs_by_type(pipeline).await?;
        if !active.is_empty() {
            info!(%pipeline, active = active.len(), "Recurring job already scheduled");
            report.skipped.push(pipeline);
            continue;
        }

        let job = ScheduledJobDetails::new(JobPayload::PartnerFile(PartnerFilePayload::new(pipeline)))
            .with_description(pipeline.name())
            .with_recurrence(Recurrence::minutes(interval_minutes));
        let scheduled = scheduler.schedule_job(job).await?;

        info!(%pipeline, job_id = %scheduled.job_id, interval_minutes, "Seeded recurring job");
        report.scheduled.push((pipeline, scheduled.job_id));
    }

    Ok(report)
}

/// Seed every partner file pipeline, on the lease holder only.
///
/// Returns `Ok(None)` on instances that lost the lease race.
pub async fn seed_with_lease(
    monitor: &ConcurrencyMonitor,
    scheduler: &dyn Scheduler,
    interval_minutes: u32,
) -> SchedulerResult<Option<SeedReport>> {
    monitor
        .invoke_with_lease(|| {
            seed_recurring_jobs(scheduler, ScheduledJobType::partner_file_pipelines(), interval_minutes)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clo_scheduler::{JobState, MemoryScheduler, RecurrenceFrequency};

    #[tokio::test]
    async fn test_seeding_is_idempotent() {
        let scheduler = MemoryScheduler::new();
        let pipelines = ScheduledJobType::partner_file_pipelines();

        let first = seed_recurring_jobs(&scheduler, pipelines, 60).await.unwrap();
        assert_eq!(first.scheduled.len(), pipelines.len());
        assert!(first.skipped.is_empty());

        let second = seed_recurring_jobs(&scheduler, pipelines, 60).await.unwrap();
        assert!(second.scheduled.is_empty());
        assert_eq!(second.skipped, pipelines.to_vec());

        for &pipeline in pipelines {
            let jobs = scheduler
                .get_jobs_by_type_and_description(pipeline, pipeline.name())
                .await
                .unwrap();
            assert_eq!(jobs.len(), 1);

            let job = &jobs[0];
            assert_eq!(job.job_state, JobState::RUNNING);
            let recurrence = job.recurrence.unwrap();
            assert_eq!(recurrence.frequency, RecurrenceFrequency::Minute);
            assert_eq!(recurrence.interval, 60);
        }
    }

    #[tokio::test]
    async fn test_paused_job_still_counts_as_seeded() {
        let scheduler = MemoryScheduler::new();
        let first = seed_recurring_jobs(&scheduler, &[ScheduledJobType::ProcessVisaRebate], 30)
            .await
            .unwrap();

        let mut job = scheduler
            .get_job_by_id(&first.scheduled[0].1)
            .await
            .unwrap()
            .unwrap();
        job.job_state = JobState::PAUSED;
        scheduler.update_job(job).await.unwrap();

        let second = seed_recurring_jobs(&scheduler, &[ScheduledJobType::ProcessVisaRebate], 30)
            .await
            .unwrap();
        assert_eq!(second.skipped, vec![ScheduledJobType::ProcessVisaRebate]);
    }

    #[tokio::test]
    async fn test_reward_types_are_rejected() {
        let scheduler = MemoryScheduler::new();
        let err = seed_recurring_jobs(&scheduler, &[ScheduledJobType::ApplyReferralReward], 60)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Validation(_)));
    }
}
