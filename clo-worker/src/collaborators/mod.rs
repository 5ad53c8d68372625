//! Data-access and partner collaborators the jobs call into.
//!
//! Only the contracts live here, together with in-memory stand-ins used by
//! the binary and the tests. Every operation reports its business outcome as
//! a [`ResultCode`]; transport failures are [`CollaboratorError`]s.

pub mod memory;

pub use memory::{
    InMemoryReferralOperations, InMemoryRewardOperations, InMemorySettlementFileProcessor,
};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clo_scheduler::{ReferralEvent, ScheduledJobType};

use crate::error::CollaboratorResult;

/// Enumerated outcome of a collaborator operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    Success,
    Created,
    RewardPayoutNotFound,
    PayoutStatusTooAdvanced,
    ReferralAlreadyRecorded,
    FileAlreadyProcessed,
    UserNotFound,
    FileNotFound,
    UnknownError,
}

impl ResultCode {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Created)
    }

    /// The write was already applied by an earlier delivery of the same job
    pub fn is_already_processed(self) -> bool {
        matches!(
            self,
            Self::PayoutStatusTooAdvanced | Self::ReferralAlreadyRecorded | Self::FileAlreadyProcessed
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Created => "Created",
            Self::RewardPayoutNotFound => "RewardPayoutNotFound",
            Self::PayoutStatusTooAdvanced => "PayoutStatusTooAdvanced",
            Self::ReferralAlreadyRecorded => "ReferralAlreadyRecorded",
            Self::FileAlreadyProcessed => "FileAlreadyProcessed",
            Self::UserNotFound => "UserNotFound",
            Self::FileNotFound => "FileNotFound",
            Self::UnknownError => "UnknownError",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lifecycle of a reward payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardPayoutStatus {
    Pending,
    Paid,
    Rescinded,
    NoEligibleUser,
}

/// Who a payout is owed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayeeType {
    User,
    Unknown,
}

/// Reward payout as stored by the rewards data layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPayoutRecord {
    pub reward_payout_id: Uuid,
    pub reward_id: Uuid,
    pub payee_id: Uuid,
    pub payee_type: PayeeType,
    pub rescinded: bool,
    pub status: RewardPayoutStatus,
}

#[async_trait]
pub trait RewardOperations: Send + Sync {
    async fn retrieve_reward_payout_record(
        &self,
        reward_payout_id: Uuid,
    ) -> CollaboratorResult<Option<RewardPayoutRecord>>;

    /// Move a pending payout to `status`; payouts past `Pending` are left
    /// untouched and reported as `PayoutStatusTooAdvanced`
    async fn update_reward_payout_status(
        &self,
        reward_payout_id: Uuid,
        status: RewardPayoutStatus,
    ) -> CollaboratorResult<ResultCode>;
}

#[async_trait]
pub trait ReferralOperations: Send + Sync {
    /// Record a referral; recording the same event twice is
    /// `ReferralAlreadyRecorded`
    async fn add_referral(
        &self,
        global_user_id: Uuid,
        event: ReferralEvent,
        referral_code: Option<&str>,
    ) -> CollaboratorResult<ResultCode>;
}

/// Ingests partner settlement, clearing and rebate files
#[async_trait]
pub trait SettlementFileProcessor: Send + Sync {
    /// Process one named file, or every pending file when `file_name` is `None`
    async fn process(
        &self,
        pipeline: ScheduledJobType,
        file_name: Option<&str>,
    ) -> CollaboratorResult<ResultCode>;
}

/// Collaborator instances shared by every job handler
#[derive(Clone)]
pub struct Collaborators {
    pub rewards: Arc<dyn RewardOperations>,
    pub referrals: Arc<dyn ReferralOperations>,
    pub settlement: Arc<dyn SettlementFileProcessor>,
}

impl Collaborators {
    /// Empty in-memory stand-ins
    pub fn in_memory() -> Self {
        Self {
            rewards: Arc::new(InMemoryRewardOperations::new()),
            referrals: Arc::new(InMemoryReferralOperations::new()),
            settlement: Arc::new(InMemorySettlementFileProcessor::new()),
        }
    }
}
