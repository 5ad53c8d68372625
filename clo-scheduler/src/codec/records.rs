use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Payload, PayloadRecord};
use crate::error::PayloadError;
use crate::types::ScheduledJobType;

/// Payload keys shared with producers
pub mod keys {
    pub const FILE_NAME: &str = "FileName";
    pub const REWARD_PAYOUT_ID: &str = "RewardPayoutId";
    pub const PARTNER_CARD_ID: &str = "PartnerCardId";
    pub const PARTNER_REDEEMED_DEAL_ID: &str = "PartnerRedeemedDealId";
    pub const REWARD_ID: &str = "RewardId";
    pub const GLOBAL_USER_ID: &str = "GlobalUserId";
    pub const REFERRAL_EVENT: &str = "ReferralEvent";
    pub const REFERRAL_CODE: &str = "ReferralCode";
}

/// Partner file pipeline run; the file name pins a specific file, otherwise
/// the pipeline picks up whatever is pending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerFilePayload {
    pub pipeline: ScheduledJobType,
    pub file_name: Option<String>,
}

impl PartnerFilePayload {
    pub fn new(pipeline: ScheduledJobType) -> Self {
        Self {
            pipeline,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

impl PayloadRecord for PartnerFilePayload {
    fn job_type(&self) -> ScheduledJobType {
        self.pipeline
    }

    fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        if let Some(file_name) = &self.file_name {
            payload.insert(keys::FILE_NAME, file_name);
        }
        payload
    }

    fn from_payload(job_type: ScheduledJobType, payload: &Payload) -> Result<Self, PayloadError> {
        if !job_type.is_partner_file_pipeline() {
            return Err(PayloadError::UnexpectedJobType(job_type));
        }
        Ok(Self {
            pipeline: job_type,
            file_name: payload.optional(keys::FILE_NAME)?,
        })
    }
}

/// Reward payout earned by a redeemed deal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRedemptionRewardPayload {
    pub reward_payout_id: Uuid,
    pub partner_card_id: String,
    pub partner_redeemed_deal_id: String,
    pub reward_id: Uuid,
}

impl PayloadRecord for ApplyRedemptionRewardPayload {
    fn job_type(&self) -> ScheduledJobType {
        ScheduledJobType::ApplyRedemptionReward
    }

    fn to_payload(&self) -> Payload {
        Payload::new()
            .with(keys::REWARD_PAYOUT_ID, self.reward_payout_id)
            .with(keys::PARTNER_CARD_ID, &self.partner_card_id)
            .with(keys::PARTNER_REDEEMED_DEAL_ID, &self.partner_redeemed_deal_id)
            .with(keys::REWARD_ID, self.reward_id)
    }

    fn from_payload(job_type: ScheduledJobType, payload: &Payload) -> Result<Self, PayloadError> {
        if job_type != ScheduledJobType::ApplyRedemptionReward {
            return Err(PayloadError::UnexpectedJobType(job_type));
        }
        Ok(Self {
            reward_payout_id: payload.required(keys::REWARD_PAYOUT_ID)?,
            partner_card_id: payload.required(keys::PARTNER_CARD_ID)?,
            partner_redeemed_deal_id: payload.required(keys::PARTNER_REDEEMED_DEAL_ID)?,
            reward_id: payload.required(keys::REWARD_ID)?,
        })
    }
}

/// Event that triggered a referral reward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferralEvent {
    Signup,
    CardLinked,
    FirstEarn,
}

impl ReferralEvent {
    pub fn name(self) -> &'static str {
        match self {
            Self::Signup => "Signup",
            Self::CardLinked => "CardLinked",
            Self::FirstEarn => "FirstEarn",
        }
    }
}

impl std::fmt::Display for ReferralEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ReferralEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "signup" => Ok(Self::Signup),
            "cardlinked" => Ok(Self::CardLinked),
            "firstearn" => Ok(Self::FirstEarn),
            _ => Err(format!("Invalid referral event: {}", s)),
        }
    }
}

/// Referral to record for a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReferralRewardPayload {
    pub global_user_id: Uuid,
    pub referral_event: ReferralEvent,
    pub referral_code: Option<String>,
}

impl PayloadRecord for ApplyReferralRewardPayload {
    fn job_type(&self) -> ScheduledJobType {
        ScheduledJobType::ApplyReferralReward
    }

    fn to_payload(&self) -> Payload {
        let mut payload = Payload::new()
            .with(keys::GLOBAL_USER_ID, self.global_user_id)
            .with(keys::REFERRAL_EVENT, self.referral_event);
        if let Some(code) = &self.referral_code {
            payload.insert(keys::REFERRAL_CODE, code);
        }
        payload
    }

    fn from_payload(job_type: ScheduledJobType, payload: &Payload) -> Result<Self, PayloadError> {
        if job_type != ScheduledJobType::ApplyReferralReward {
            return Err(PayloadError::UnexpectedJobType(job_type));
        }
        Ok(Self {
            global_user_id: payload.required(keys::GLOBAL_USER_ID)?,
            referral_event: payload.required(keys::REFERRAL_EVENT)?,
            referral_code: payload.optional(keys::REFERRAL_CODE)?,
        })
    }
}
