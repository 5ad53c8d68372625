use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SchedulerError, SchedulerResult};

/// Unit of a recurrence period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecurrenceFrequency {
    /// Runs once
    None,
    Second,
    Minute,
    Hour,
    Day,
}

impl RecurrenceFrequency {
    fn unit(self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Second => Some(Duration::seconds(1)),
            Self::Minute => Some(Duration::minutes(1)),
            Self::Hour => Some(Duration::hours(1)),
            Self::Day => Some(Duration::days(1)),
        }
    }
}

/// How a job reschedules itself after each completed iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: RecurrenceFrequency,

    /// Number of frequency units between iterations
    pub interval: u32,

    /// Total number of iterations; unbounded when absent
    pub count: Option<u32>,
}

impl Recurrence {
    /// A recurrence that runs exactly once
    pub fn once() -> Self {
        Self {
            frequency: RecurrenceFrequency::None,
            interval: 0,
            count: None,
        }
    }

    pub fn every(frequency: RecurrenceFrequency, interval: u32) -> Self {
        Self {
            frequency,
            interval,
            count: None,
        }
    }

    pub fn minutes(interval: u32) -> Self {
        Self::every(RecurrenceFrequency::Minute, interval)
    }

    pub fn hourly() -> Self {
        Self::every(RecurrenceFrequency::Hour, 1)
    }

    /// Bound the total number of iterations
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.frequency != RecurrenceFrequency::None
    }

    /// Time between iterations, `None` for one-shot recurrences
    pub fn period(&self) -> Option<Duration> {
        let interval = i32::try_from(self.interval).ok()?;
        self.frequency.unit()?.checked_mul(interval)
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        if self.is_recurring() && self.interval == 0 {
            return Err(SchedulerError::validation(format!(
                "recurrence interval must be at least 1 for frequency {:?}",
                self.frequency
            )));
        }
        if self.is_recurring() && self.period().is_none() {
            return Err(SchedulerError::validation(format!(
                "recurrence interval {} is out of range",
                self.interval
            )));
        }
        if self.count == Some(0) {
            return Err(SchedulerError::validation(
                "recurrence count must be at least 1 when set",
            ));
        }
        Ok(())
    }

    /// Whether no further iteration may run after `run_count` completed ones
    pub fn is_exhausted(&self, run_count: u32) -> bool {
        if !self.is_recurring() {
            return run_count >= 1;
        }
        matches!(self.count, Some(count) if run_count >= count)
    }

    /// Start time of the iteration following one completed at `completed_at`
    pub fn next_start_time(&self, completed_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.period()
            .and_then(|period| completed_at.checked_add_signed(period))
    }
}

impl Default for Recurrence {
    fn default() -> Self {
        Self::once()
    }
}
