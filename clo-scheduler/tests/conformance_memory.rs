use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio_stream::StreamExt;
use uuid::Uuid;

use clo_scheduler::{
    ApplyRedemptionRewardPayload, Clock, JobPayload, JobState, ManualClock, MemoryScheduler,
    PartnerFilePayload, Payload, Recurrence, ScheduledJobDetails, ScheduledJobType, Scheduler,
    SchedulerError,
};

/// Test factory functions
fn create_scheduler() -> (Arc<ManualClock>, MemoryScheduler) {
    let clock = Arc::new(ManualClock::starting_now());
    let scheduler = MemoryScheduler::new().with_clock(clock.clone());
    (clock, scheduler)
}

fn create_pipeline_job(job_type: ScheduledJobType) -> ScheduledJobDetails {
    ScheduledJobDetails::new(JobPayload::PartnerFile(PartnerFilePayload::new(job_type)))
}

fn create_redemption_job() -> ScheduledJobDetails {
    ScheduledJobDetails::new(JobPayload::ApplyRedemptionReward(ApplyRedemptionRewardPayload {
        reward_payout_id: Uuid::new_v4(),
        partner_card_id: "ABC123".to_string(),
        partner_redeemed_deal_id: "XYZ".to_string(),
        reward_id: Uuid::new_v4(),
    }))
}

/// One-shot job is never delivered again after completion
#[tokio::test]
async fn test_one_shot_job_runs_once() {
    let (clock, scheduler) = create_scheduler();
    let job = scheduler.schedule_job(create_redemption_job()).await.unwrap();

    let claimed = scheduler.get_job_to_process().await.unwrap().unwrap();
    scheduler.complete_job_iteration(&claimed).await.unwrap();

    // Well past any visibility window
    clock.advance(ChronoDuration::hours(2));
    assert!(scheduler.get_job_to_process().await.unwrap().is_none());

    let stored = scheduler.get_job_by_id(&job.job_id).await.unwrap().unwrap();
    assert_eq!(stored.job_state, JobState::COMPLETED);
    assert_eq!(stored.run_count, 1);
}

/// Hourly recurrence reschedules one hour after the run
#[tokio::test]
async fn test_hourly_job_reschedules() {
    let (clock, scheduler) = create_scheduler();
    let job = scheduler
        .schedule_job(
            create_pipeline_job(ScheduledJobType::ProcessMasterCardRebate)
                .with_recurrence(Recurrence::hourly()),
        )
        .await
        .unwrap();

    for iteration in 1..=3u32 {
        let claimed = scheduler.get_job_to_process().await.unwrap().unwrap();
        assert_eq!(claimed.job.job_id, job.job_id);
        let completed_at = clock.now();
        scheduler.complete_job_iteration(&claimed).await.unwrap();

        let stored = scheduler.get_job_by_id(&job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.job_state, JobState::RUNNING);
        assert_eq!(stored.run_count, iteration);
        assert_eq!(stored.start_time, Some(completed_at + ChronoDuration::hours(1)));

        // Not eligible before the hour is up
        clock.advance(ChronoDuration::minutes(59));
        assert!(scheduler.get_job_to_process().await.unwrap().is_none());
        clock.advance(ChronoDuration::minutes(1));
    }
}

/// Count bounds the number of iterations
#[tokio::test]
async fn test_recurrence_count_exhausts() {
    let (clock, scheduler) = create_scheduler();
    let job = scheduler
        .schedule_job(
            create_pipeline_job(ScheduledJobType::ProcessAmexStatement)
                .with_recurrence(Recurrence::minutes(5).with_count(2)),
        )
        .await
        .unwrap();

    for _ in 0..2 {
        let claimed = scheduler.get_job_to_process().await.unwrap().unwrap();
        scheduler.complete_job_iteration(&claimed).await.unwrap();
        clock.advance(ChronoDuration::minutes(5));
    }

    assert!(scheduler.get_job_to_process().await.unwrap().is_none());
    let stored = scheduler.get_job_by_id(&job.job_id).await.unwrap().unwrap();
    assert_eq!(stored.job_state, JobState::COMPLETED);
    assert_eq!(stored.run_count, 2);
}

/// Future start time is a not-before bound
#[tokio::test]
async fn test_start_time_gates_delivery() {
    let (clock, scheduler) = create_scheduler();
    let start = clock.now() + ChronoDuration::minutes(10);
    scheduler
        .schedule_job(create_redemption_job().with_start_time(start))
        .await
        .unwrap();

    assert!(scheduler.get_job_to_process().await.unwrap().is_none());
    clock.advance(ChronoDuration::minutes(10));
    assert!(scheduler.get_job_to_process().await.unwrap().is_some());
}

/// Unacknowledged job reappears after the visibility window
#[tokio::test]
async fn test_lapsed_visibility_redelivers() {
    let (clock, scheduler) = create_scheduler();
    let job = scheduler.schedule_job(create_redemption_job()).await.unwrap();

    let first = scheduler.get_job_to_process().await.unwrap().unwrap();
    clock.advance(ChronoDuration::seconds(59));
    assert!(scheduler.get_job_to_process().await.unwrap().is_none());

    clock.advance(ChronoDuration::seconds(2));
    let second = scheduler.get_job_to_process().await.unwrap().unwrap();
    assert_eq!(second.job.job_id, job.job_id);
    assert_ne!(second.receipt, first.receipt);
}

/// Extending visibility keeps a long job hidden
#[tokio::test]
async fn test_visibility_extension_prevents_duplicate_claim() {
    let (clock, scheduler) = create_scheduler();
    scheduler.schedule_job(create_redemption_job()).await.unwrap();

    let mut claimed = scheduler.get_job_to_process().await.unwrap().unwrap();
    for _ in 0..5 {
        clock.advance(ChronoDuration::seconds(55));
        claimed = scheduler
            .increase_visibility_timeout(&claimed, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(scheduler.get_job_to_process().await.unwrap().is_none());
    }

    scheduler.complete_job_iteration(&claimed).await.unwrap();
}

/// A visibility window past the end of the calendar is rejected, not applied
#[tokio::test]
async fn test_out_of_range_visibility_timeout_is_rejected() {
    let huge = Duration::from_secs(10_000_000_000_000);

    let (_, scheduler) = create_scheduler();
    let oversized = scheduler.clone().with_visibility_timeout(huge);
    scheduler.schedule_job(create_redemption_job()).await.unwrap();

    let err = oversized.get_job_to_process().await.unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(_)));

    // Nothing was claimed by the failed attempt
    let claimed = scheduler.get_job_to_process().await.unwrap().unwrap();

    let err = scheduler
        .increase_visibility_timeout(&claimed, huge)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(_)));

    // The claim is untouched and still completes
    assert!(scheduler.get_job_to_process().await.unwrap().is_none());
    scheduler.complete_job_iteration(&claimed).await.unwrap();
}

/// Invariants are enforced at schedule time
#[tokio::test]
async fn test_schedule_validation() {
    let (_, scheduler) = create_scheduler();

    let blank = create_redemption_job().with_job_id("");
    assert!(matches!(
        scheduler.schedule_job(blank).await,
        Err(SchedulerError::Validation(_))
    ));

    let mut preset = create_redemption_job();
    preset.job_state = JobState::PAUSED;
    assert!(matches!(
        scheduler.schedule_job(preset).await,
        Err(SchedulerError::Validation(_))
    ));
}

/// Seeding queries see only active jobs of the type
#[tokio::test]
async fn test_active_job_queries() {
    let (_, scheduler) = create_scheduler();

    scheduler
        .schedule_job(
            create_pipeline_job(ScheduledJobType::ProcessMasterCardClearing)
                .with_description("ProcessMasterCardClearing")
                .with_recurrence(Recurrence::hourly()),
        )
        .await
        .unwrap();
    let one_shot = scheduler
        .schedule_job(create_pipeline_job(ScheduledJobType::ProcessMasterCardClearing))
        .await
        .unwrap();

    let active = scheduler
        .get_all_active_jobs_by_type(ScheduledJobType::ProcessMasterCardClearing)
        .await
        .unwrap();
    assert_eq!(active.len(), 2);

    // Drain the one-shot job; it is no longer active
    loop {
        let claimed = scheduler.get_job_to_process().await.unwrap().unwrap();
        let done = claimed.job.job_id == one_shot.job_id;
        scheduler.complete_job_iteration(&claimed).await.unwrap();
        if done {
            break;
        }
    }

    let active = scheduler
        .get_all_active_jobs_by_type(ScheduledJobType::ProcessMasterCardClearing)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);

    let described = scheduler
        .get_jobs_by_type_and_description(
            ScheduledJobType::ProcessMasterCardClearing,
            "ProcessMasterCardClearing",
        )
        .await
        .unwrap();
    assert_eq!(described.len(), 1);
    assert!(scheduler
        .get_jobs_by_type_and_description(ScheduledJobType::ProcessMasterCardClearing, "other")
        .await
        .unwrap()
        .is_empty());
}

/// Payload updates land in place and bump the version
#[tokio::test]
async fn test_update_payload() {
    let (_, scheduler) = create_scheduler();
    let job = scheduler
        .schedule_job(create_pipeline_job(ScheduledJobType::ProcessFirstDataExtract))
        .await
        .unwrap();

    let payload = Payload::new().with("FileName", "extract-0001.txt");
    let updated = scheduler.update_job_payload(&job.job_id, payload.clone()).await.unwrap();
    assert_eq!(updated.payload, payload);
    assert_eq!(updated.version, job.version + 1);

    let claimed = scheduler.get_job_to_process().await.unwrap().unwrap();
    assert_eq!(claimed.job.payload.get("FileName"), Some("extract-0001.txt"));
}

/// Canceled job is not delivered and cannot be updated
#[tokio::test]
async fn test_cancel_removes_job() {
    let (_, scheduler) = create_scheduler();
    let mut job = scheduler
        .schedule_job(create_redemption_job().with_recurrence(Recurrence::once()))
        .await
        .unwrap();

    job.job_state = JobState::CANCELED;
    let canceled = scheduler.update_job(job).await.unwrap();
    assert!(scheduler.get_job_to_process().await.unwrap().is_none());

    let again = scheduler.update_job(canceled).await;
    assert!(matches!(again, Err(SchedulerError::JobAlreadyTerminal { .. })));
}

/// Lifecycle events are broadcast
#[tokio::test]
async fn test_event_stream() {
    let (_, scheduler) = create_scheduler();
    let mut events = scheduler.event_stream();

    let job = scheduler.schedule_job(create_redemption_job()).await.unwrap();
    let claimed = scheduler.get_job_to_process().await.unwrap().unwrap();
    scheduler.complete_job_iteration(&claimed).await.unwrap();

    let mut names = Vec::new();
    for _ in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(1), events.next())
            .await
            .expect("Timeout waiting for event")
            .expect("Stream ended");
        assert_eq!(event.job_id(), &job.job_id);
        names.push(event.event_name());
    }
    assert_eq!(names, vec!["scheduled", "claimed", "completed"]);
}
