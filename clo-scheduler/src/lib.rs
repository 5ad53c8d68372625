//! # clo-scheduler: durable job scheduling for the card-linked offer back end
//!
//! Producers (API handlers, file processors, other jobs) describe work as a
//! [`ScheduledJobDetails`] and hand it to a [`Scheduler`]. Workers claim jobs
//! with [`Scheduler::get_job_to_process`], which hides the job for a
//! visibility window instead of locking it, and acknowledge each run with
//! [`Scheduler::complete_job_iteration`]. Delivery is at-least-once.
//!
//! ```rust
//! use clo_scheduler::prelude::*;
//! use uuid::Uuid;
//!
//! # async fn demo() -> SchedulerResult<()> {
//! let scheduler = MemoryScheduler::new();
//!
//! let payload = ApplyRedemptionRewardPayload {
//!     reward_payout_id: Uuid::new_v4(),
//!     partner_card_id: "ABC123".to_string(),
//!     partner_redeemed_deal_id: "XYZ".to_string(),
//!     reward_id: Uuid::new_v4(),
//! };
//!
//! scheduler.schedule_job(ScheduledJobDetails::new(payload.into())).await?;
//!
//! if let Some(claimed) = scheduler.get_job_to_process().await? {
//!     // run the handler, then acknowledge
//!     scheduler.complete_job_iteration(&claimed).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod clock;
pub mod codec;
pub mod error;
pub mod types;

pub use backend::memory::{MemoryScheduler, DEFAULT_VISIBILITY_TIMEOUT};
pub use backend::{BoxStream, Scheduler};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{
    keys, ApplyRedemptionRewardPayload, ApplyReferralRewardPayload, JobPayload, PartnerFilePayload,
    Payload, PayloadRecord, ReferralEvent,
};
pub use error::{PayloadError, SchedulerError, SchedulerResult};
pub use types::{
    ClaimedJob, JobEvent, JobId, JobState, PopReceipt, Recurrence, RecurrenceFrequency,
    ScheduledJobDetails, ScheduledJobType,
};

/// Common imports for producers and workers
pub mod prelude {
    pub use crate::{
        ApplyRedemptionRewardPayload, ApplyReferralRewardPayload, ClaimedJob, JobPayload,
        JobState, MemoryScheduler, PartnerFilePayload, Payload, Recurrence, RecurrenceFrequency,
        ReferralEvent, ScheduledJobDetails, ScheduledJobType, Scheduler, SchedulerError,
        SchedulerResult,
    };

    pub use async_trait::async_trait;
}
