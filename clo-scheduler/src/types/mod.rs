pub mod ids;
pub mod job_type;
pub mod state;
pub mod recurrence;
pub mod details;
pub mod events;

pub use ids::{JobId, PopReceipt};
pub use job_type::ScheduledJobType;
pub use state::JobState;
pub use recurrence::{Recurrence, RecurrenceFrequency};
pub use details::{ClaimedJob, ScheduledJobDetails};
pub use events::JobEvent;
