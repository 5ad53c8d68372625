use serde::{Deserialize, Serialize};

/// Tag selecting the handler for a scheduled job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScheduledJobType {
    /// Ingest the MasterCard clearing file
    ProcessMasterCardClearing,

    /// Ingest the MasterCard rebate file
    ProcessMasterCardRebate,

    /// Send the MasterCard filtering file
    ProcessMasterCardFiltering,

    /// Ingest the Amex transaction log
    ProcessAmexTransactionLog,

    /// Ingest the Amex statement file
    ProcessAmexStatement,

    /// Ingest the First Data extract
    ProcessFirstDataExtract,

    /// Ingest the Visa rebate file
    ProcessVisaRebate,

    /// Pay out (or rescind) the reward earned by a redemption
    ApplyRedemptionReward,

    /// Record a referral and reward the referrer
    ApplyReferralReward,
}

impl ScheduledJobType {
    /// Every known job type
    pub fn all() -> &'static [ScheduledJobType] {
        &[
            Self::ProcessMasterCardClearing,
            Self::ProcessMasterCardRebate,
            Self::ProcessMasterCardFiltering,
            Self::ProcessAmexTransactionLog,
            Self::ProcessAmexStatement,
            Self::ProcessFirstDataExtract,
            Self::ProcessVisaRebate,
            Self::ApplyRedemptionReward,
            Self::ApplyReferralReward,
        ]
    }

    /// Job types backing the recurring partner file pipelines
    pub fn partner_file_pipelines() -> &'static [ScheduledJobType] {
        &[
            Self::ProcessMasterCardClearing,
            Self::ProcessMasterCardRebate,
            Self::ProcessMasterCardFiltering,
            Self::ProcessAmexTransactionLog,
            Self::ProcessAmexStatement,
            Self::ProcessFirstDataExtract,
            Self::ProcessVisaRebate,
        ]
    }

    /// Whether this job type is a partner file pipeline
    pub fn is_partner_file_pipeline(self) -> bool {
        Self::partner_file_pipelines().contains(&self)
    }

    /// Whether jobs of this type run through the orchestrated job tree
    pub fn is_orchestrated(self) -> bool {
        matches!(self, Self::ApplyRedemptionReward | Self::ApplyReferralReward)
    }

    /// Stable name used in logs and persisted rows
    pub fn name(self) -> &'static str {
        match self {
            Self::ProcessMasterCardClearing => "ProcessMasterCardClearing",
            Self::ProcessMasterCardRebate => "ProcessMasterCardRebate",
            Self::ProcessMasterCardFiltering => "ProcessMasterCardFiltering",
            Self::ProcessAmexTransactionLog => "ProcessAmexTransactionLog",
            Self::ProcessAmexStatement => "ProcessAmexStatement",
            Self::ProcessFirstDataExtract => "ProcessFirstDataExtract",
            Self::ProcessVisaRebate => "ProcessVisaRebate",
            Self::ApplyRedemptionReward => "ApplyRedemptionReward",
            Self::ApplyReferralReward => "ApplyReferralReward",
        }
    }
}

impl std::fmt::Display for ScheduledJobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScheduledJobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|job_type| job_type.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid job type: {}", s))
    }
}
