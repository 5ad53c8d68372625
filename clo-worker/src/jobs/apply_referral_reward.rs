use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use clo_scheduler::ApplyReferralRewardPayload;

use crate::collaborators::ReferralOperations;
use crate::error::JobResult;
use crate::orchestration::{OrchestratedExecutionResult, OrchestratedJob, OrchestratedTask};

/// Records the referral behind a signup, card link or first earn
pub struct ApplyReferralRewardJob {
    tasks: Vec<Arc<dyn OrchestratedTask>>,
}

impl ApplyReferralRewardJob {
    pub fn new(payload: ApplyReferralRewardPayload, referrals: Arc<dyn ReferralOperations>) -> Self {
        Self {
            tasks: vec![Arc::new(AddReferralTask { payload, referrals })],
        }
    }
}

#[async_trait]
impl OrchestratedJob for ApplyReferralRewardJob {
    fn name(&self) -> &str {
        "ApplyReferralReward"
    }

    fn tasks(&self) -> &[Arc<dyn OrchestratedTask>] {
        &self.tasks
    }
}

pub struct AddReferralTask {
    payload: ApplyReferralRewardPayload,
    referrals: Arc<dyn ReferralOperations>,
}

#[async_trait]
impl OrchestratedTask for AddReferralTask {
    fn name(&self) -> &str {
        "AddReferral"
    }

    async fn execute(&self) -> JobResult<OrchestratedExecutionResult> {
        let user = self.payload.global_user_id;
        let event = self.payload.referral_event;

        let code = self
            .referrals
            .add_referral(user, event, self.payload.referral_code.as_deref())
            .await?;

        if code.is_success() || code.is_already_processed() {
            info!(global_user_id = %user, referral_event = %event, result_code = %code, "Referral recorded");
            Ok(OrchestratedExecutionResult::Success)
        } else {
            warn!(global_user_id = %user, referral_event = %event, result_code = %code, "Could not record referral");
            Ok(OrchestratedExecutionResult::NonTerminalError)
        }
    }
}
