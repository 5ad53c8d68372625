use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use clo_scheduler::ApplyRedemptionRewardPayload;

use crate::collaborators::{PayeeType, RewardOperations, RewardPayoutRecord, RewardPayoutStatus};
use crate::error::JobResult;
use crate::orchestration::{OrchestratedExecutionResult, OrchestratedJob, OrchestratedTask};

/// Settles the reward payout earned by a redeemed deal
pub struct ApplyRedemptionRewardJob {
    payload: ApplyRedemptionRewardPayload,
    tasks: Vec<Arc<dyn OrchestratedTask>>,
}

impl ApplyRedemptionRewardJob {
    pub fn new(payload: ApplyRedemptionRewardPayload, rewards: Arc<dyn RewardOperations>) -> Self {
        let task = ApplyEarnCreditTask {
            payload: payload.clone(),
            rewards,
        };
        Self {
            payload,
            tasks: vec![Arc::new(task)],
        }
    }
}

#[async_trait]
impl OrchestratedJob for ApplyRedemptionRewardJob {
    fn name(&self) -> &str {
        "ApplyRedemptionReward"
    }

    fn tasks(&self) -> &[Arc<dyn OrchestratedTask>] {
        &self.tasks
    }

    async fn tear_down(&self, result: OrchestratedExecutionResult) -> JobResult<()> {
        info!(
            reward_payout_id = %self.payload.reward_payout_id,
            partner_redeemed_deal_id = %self.payload.partner_redeemed_deal_id,
            %result,
            "Finished applying redemption reward"
        );
        Ok(())
    }
}

/// Status a pending payout moves to
pub fn settled_status(record: &RewardPayoutRecord) -> RewardPayoutStatus {
    if record.rescinded {
        RewardPayoutStatus::Rescinded
    } else if record.payee_type == PayeeType::User && record.payee_id != Uuid::nil() {
        RewardPayoutStatus::Paid
    } else {
        RewardPayoutStatus::NoEligibleUser
    }
}

/// Credits the payee of a pending payout.
///
/// Keyed on the payout id: a redelivered job finds the payout past `Pending`
/// and does nothing.
pub struct ApplyEarnCreditTask {
    payload: ApplyRedemptionRewardPayload,
    rewards: Arc<dyn RewardOperations>,
}

#[async_trait]
impl OrchestratedTask for ApplyEarnCreditTask {
    fn name(&self) -> &str {
        "ApplyEarnCredit"
    }

    async fn execute(&self) -> JobResult<OrchestratedExecutionResult> {
        let payout_id = self.payload.reward_payout_id;

        let Some(record) = self.rewards.retrieve_reward_payout_record(payout_id).await? else {
            warn!(reward_payout_id = %payout_id, result_code = "RewardPayoutNotFound", "Reward payout not found");
            return Ok(OrchestratedExecutionResult::NonTerminalError);
        };

        if record.status != RewardPayoutStatus::Pending {
            info!(reward_payout_id = %payout_id, status = ?record.status, "Reward payout already settled");
            return Ok(OrchestratedExecutionResult::Success);
        }

        let status = settled_status(&record);
        let code = self.rewards.update_reward_payout_status(payout_id, status).await?;

        if code.is_already_processed() {
            info!(reward_payout_id = %payout_id, result_code = %code, "Reward payout settled concurrently");
            return Ok(OrchestratedExecutionResult::Success);
        }
        if !code.is_success() {
            warn!(reward_payout_id = %payout_id, result_code = %code, ?status, "Could not update reward payout");
            return Ok(OrchestratedExecutionResult::NonTerminalError);
        }

        if status == RewardPayoutStatus::NoEligibleUser {
            warn!(
                reward_payout_id = %payout_id,
                partner_card_id = %self.payload.partner_card_id,
                "No eligible user for reward payout"
            );
            return Ok(OrchestratedExecutionResult::NonTerminalError);
        }

        info!(reward_payout_id = %payout_id, ?status, "Reward payout settled");
        Ok(OrchestratedExecutionResult::Success)
    }
}
