//! Typed job payloads.
//!
//! On the wire a payload is a flat string-to-string map (a JSON object once
//! persisted). Handlers never read the map directly: every job type owns a
//! record implementing [`PayloadRecord`], and [`JobPayload::decode`] is the
//! single entry point that turns a `(job type, map)` pair back into a typed
//! value, failing with [`PayloadError::JobPayloadMissingData`] when a
//! required key is absent.

pub mod records;

pub use records::{
    keys, ApplyRedemptionRewardPayload, ApplyReferralRewardPayload, PartnerFilePayload,
    ReferralEvent,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::PayloadError;
use crate::types::ScheduledJobType;

/// String-keyed job parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, String>);

impl Payload {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Parse a required value; absent or blank keys are missing data
    pub fn required<T: FromStr>(&self, key: &str) -> Result<T, PayloadError> {
        self.optional(key)?.ok_or_else(|| PayloadError::missing(key))
    }

    /// Parse an optional value; blank counts as absent
    pub fn optional<T: FromStr>(&self, key: &str) -> Result<Option<T>, PayloadError> {
        match self.get(key).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| PayloadError::malformed(key, raw)),
        }
    }

    /// Serialize to the JSON object stored alongside the job row
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json).map(Self)
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (key, value) in iter {
            payload.insert(key, value);
        }
        payload
    }
}

/// A typed view of the payload carried by one job type
pub trait PayloadRecord: Sized + Send + Sync + 'static {
    /// The job type this record is scheduled under
    fn job_type(&self) -> ScheduledJobType;

    /// Flatten into the wire map
    fn to_payload(&self) -> Payload;

    /// Extract from the wire map, presence-checking every required key
    fn from_payload(job_type: ScheduledJobType, payload: &Payload) -> Result<Self, PayloadError>;
}

/// Sum of every payload record, keyed by job type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPayload {
    PartnerFile(PartnerFilePayload),
    ApplyRedemptionReward(ApplyRedemptionRewardPayload),
    ApplyReferralReward(ApplyReferralRewardPayload),
}

impl JobPayload {
    pub fn job_type(&self) -> ScheduledJobType {
        match self {
            Self::PartnerFile(record) => record.job_type(),
            Self::ApplyRedemptionReward(record) => record.job_type(),
            Self::ApplyReferralReward(record) => record.job_type(),
        }
    }

    pub fn encode(&self) -> Payload {
        match self {
            Self::PartnerFile(record) => record.to_payload(),
            Self::ApplyRedemptionReward(record) => record.to_payload(),
            Self::ApplyReferralReward(record) => record.to_payload(),
        }
    }

    /// Decode the wire map for `job_type` into its record
    pub fn decode(job_type: ScheduledJobType, payload: &Payload) -> Result<Self, PayloadError> {
        match job_type {
            ScheduledJobType::ApplyRedemptionReward => Ok(Self::ApplyRedemptionReward(
                ApplyRedemptionRewardPayload::from_payload(job_type, payload)?,
            )),
            ScheduledJobType::ApplyReferralReward => Ok(Self::ApplyReferralReward(
                ApplyReferralRewardPayload::from_payload(job_type, payload)?,
            )),
            pipeline => Ok(Self::PartnerFile(PartnerFilePayload::from_payload(
                pipeline, payload,
            )?)),
        }
    }
}

impl From<PartnerFilePayload> for JobPayload {
    fn from(record: PartnerFilePayload) -> Self {
        Self::PartnerFile(record)
    }
}

impl From<ApplyRedemptionRewardPayload> for JobPayload {
    fn from(record: ApplyRedemptionRewardPayload) -> Self {
        Self::ApplyRedemptionReward(record)
    }
}

impl From<ApplyReferralRewardPayload> for JobPayload {
    fn from(record: ApplyReferralRewardPayload) -> Self {
        Self::ApplyReferralReward(record)
    }
}
