//! Concrete job handlers and their registration

pub mod apply_redemption_reward;
pub mod apply_referral_reward;
pub mod partner_file;

pub use apply_redemption_reward::{settled_status, ApplyEarnCreditTask, ApplyRedemptionRewardJob};
pub use apply_referral_reward::{AddReferralTask, ApplyReferralRewardJob};
pub use partner_file::PartnerFileTask;

use std::sync::Arc;

use clo_scheduler::{JobPayload, PayloadError, ScheduledJobType};

use crate::collaborators::Collaborators;
use crate::error::{JobError, JobResult};
use crate::runner::{JobHandler, JobRunnerRegistry};

fn unexpected(registered_for: ScheduledJobType, payload: &JobPayload) -> JobError {
    JobError::payload(registered_for, PayloadError::UnexpectedJobType(payload.job_type()))
}

/// Register a handler for every job type the worker runs
pub fn register_default_handlers(
    registry: &mut JobRunnerRegistry,
    collaborators: &Collaborators,
) -> JobResult<()> {
    let rewards = collaborators.rewards.clone();
    registry.register(ScheduledJobType::ApplyRedemptionReward, move |payload| match payload {
        JobPayload::ApplyRedemptionReward(record) => Ok(JobHandler::Orchestrated(Arc::new(
            ApplyRedemptionRewardJob::new(record, rewards.clone()),
        ))),
        other => Err(unexpected(ScheduledJobType::ApplyRedemptionReward, &other)),
    })?;

    let referrals = collaborators.referrals.clone();
    registry.register(ScheduledJobType::ApplyReferralReward, move |payload| match payload {
        JobPayload::ApplyReferralReward(record) => Ok(JobHandler::Orchestrated(Arc::new(
            ApplyReferralRewardJob::new(record, referrals.clone()),
        ))),
        other => Err(unexpected(ScheduledJobType::ApplyReferralReward, &other)),
    })?;

    for &pipeline in ScheduledJobType::partner_file_pipelines() {
        let processor = collaborators.settlement.clone();
        registry.register(pipeline, move |payload| match payload {
            JobPayload::PartnerFile(record) if record.pipeline == pipeline => Ok(JobHandler::Task(
                Arc::new(PartnerFileTask::new(record, processor.clone())),
            )),
            other => Err(unexpected(pipeline, &other)),
        })?;
    }

    Ok(())
}
