use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use clo_scheduler::{ReferralEvent, ScheduledJobType};

use super::{
    ReferralOperations, ResultCode, RewardOperations, RewardPayoutRecord, RewardPayoutStatus,
    SettlementFileProcessor,
};
use crate::error::CollaboratorResult;

/// Reward payouts held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRewardOperations {
    payouts: Arc<RwLock<HashMap<Uuid, RewardPayoutRecord>>>,
    applied: Arc<RwLock<Vec<(Uuid, RewardPayoutStatus)>>>,
}

impl InMemoryRewardOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: RewardPayoutRecord) {
        self.payouts.write().insert(record.reward_payout_id, record);
    }

    pub fn get(&self, reward_payout_id: Uuid) -> Option<RewardPayoutRecord> {
        self.payouts.read().get(&reward_payout_id).cloned()
    }

    /// Status writes that actually changed a record, in order
    pub fn applied_updates(&self) -> Vec<(Uuid, RewardPayoutStatus)> {
        self.applied.read().clone()
    }
}

#[async_trait]
impl RewardOperations for InMemoryRewardOperations {
    async fn retrieve_reward_payout_record(
        &self,
        reward_payout_id: Uuid,
    ) -> CollaboratorResult<Option<RewardPayoutRecord>> {
        Ok(self.get(reward_payout_id))
    }

    async fn update_reward_payout_status(
        &self,
        reward_payout_id: Uuid,
        status: RewardPayoutStatus,
    ) -> CollaboratorResult<ResultCode> {
        let mut payouts = self.payouts.write();
        let Some(record) = payouts.get_mut(&reward_payout_id) else {
            return Ok(ResultCode::RewardPayoutNotFound);
        };
        if record.status != RewardPayoutStatus::Pending {
            return Ok(ResultCode::PayoutStatusTooAdvanced);
        }

        record.status = status;
        self.applied.write().push((reward_payout_id, status));
        Ok(ResultCode::Success)
    }
}

/// Users and referral events held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferralOperations {
    users: Arc<RwLock<HashSet<Uuid>>>,
    referrals: Arc<RwLock<Vec<(Uuid, ReferralEvent, Option<String>)>>>,
}

impl InMemoryReferralOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, global_user_id: Uuid) {
        self.users.write().insert(global_user_id);
    }

    pub fn referrals(&self) -> Vec<(Uuid, ReferralEvent, Option<String>)> {
        self.referrals.read().clone()
    }
}

#[async_trait]
impl ReferralOperations for InMemoryReferralOperations {
    async fn add_referral(
        &self,
        global_user_id: Uuid,
        event: ReferralEvent,
        referral_code: Option<&str>,
    ) -> CollaboratorResult<ResultCode> {
        if !self.users.read().contains(&global_user_id) {
            return Ok(ResultCode::UserNotFound);
        }

        let mut referrals = self.referrals.write();
        if referrals
            .iter()
            .any(|(user, recorded, _)| *user == global_user_id && *recorded == event)
        {
            return Ok(ResultCode::ReferralAlreadyRecorded);
        }

        referrals.push((global_user_id, event, referral_code.map(str::to_string)));
        Ok(ResultCode::Created)
    }
}

#[derive(Debug, Default)]
struct FileTables {
    pending: HashMap<ScheduledJobType, Vec<String>>,
    processed: Vec<(ScheduledJobType, String)>,
}

/// Partner files waiting in memory, keyed by pipeline
#[derive(Debug, Clone, Default)]
pub struct InMemorySettlementFileProcessor {
    tables: Arc<RwLock<FileTables>>,
}

impl InMemorySettlementFileProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a file into a pipeline's inbox
    pub fn add_pending(&self, pipeline: ScheduledJobType, file_name: impl Into<String>) {
        self.tables
            .write()
            .pending
            .entry(pipeline)
            .or_default()
            .push(file_name.into());
    }

    pub fn processed(&self) -> Vec<(ScheduledJobType, String)> {
        self.tables.read().processed.clone()
    }
}

#[async_trait]
impl SettlementFileProcessor for InMemorySettlementFileProcessor {
    async fn process(
        &self,
        pipeline: ScheduledJobType,
        file_name: Option<&str>,
    ) -> CollaboratorResult<ResultCode> {
        let mut tables = self.tables.write();
        let FileTables { pending, processed } = &mut *tables;
        let inbox = pending.entry(pipeline).or_default();

        let picked: Vec<String> = match file_name {
            Some(name) => {
                if processed.iter().any(|(p, f)| *p == pipeline && f == name) {
                    return Ok(ResultCode::FileAlreadyProcessed);
                }
                match inbox.iter().position(|f| f == name) {
                    Some(index) => vec![inbox.remove(index)],
                    None => return Ok(ResultCode::FileNotFound),
                }
            }
            None => std::mem::take(inbox),
        };

        if picked.is_empty() {
            return Ok(ResultCode::FileNotFound);
        }
        processed.extend(picked.into_iter().map(|file| (pipeline, file)));
        Ok(ResultCode::Success)
    }
}
