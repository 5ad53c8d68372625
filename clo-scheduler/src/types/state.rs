use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// Job state flags.
///
/// A stored job carries exactly one of the single-bit states. Masks built
/// with `|` (or [`JobState::ALL`]) are only meaningful as query filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobState(u8);

impl JobState {
    /// Unset; the only state a producer may submit
    pub const NOT_SPECIFIED: Self = Self(0);

    /// Active and eligible for delivery once its start time passes
    pub const RUNNING: Self = Self(1);

    /// Kept but never delivered
    pub const PAUSED: Self = Self(1 << 1);

    /// Terminated by an operator
    pub const CANCELED: Self = Self(1 << 2);

    /// Recurrence exhausted or one-shot run acknowledged
    pub const COMPLETED: Self = Self(1 << 3);

    /// Query convenience matching every real state
    pub const ALL: Self = Self(0b1111);

    /// Jobs that still exist from the seeding point of view
    pub const ACTIVE: Self = Self(Self::RUNNING.0 | Self::PAUSED.0);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether this state is selected by the given mask
    pub fn matches(self, mask: JobState) -> bool {
        self.0 & mask.0 != 0
    }

    pub fn is_terminal(self) -> bool {
        self.matches(Self::CANCELED | Self::COMPLETED)
    }

    pub fn is_active(self) -> bool {
        self.matches(Self::ACTIVE)
    }

    /// Human-readable name (masks render as `mask(0b..)`)
    pub fn name(self) -> String {
        match self {
            Self::NOT_SPECIFIED => "not_specified".to_string(),
            Self::RUNNING => "running".to_string(),
            Self::PAUSED => "paused".to_string(),
            Self::CANCELED => "canceled".to_string(),
            Self::COMPLETED => "completed".to_string(),
            Self::ALL => "all".to_string(),
            other => format!("mask({:#06b})", other.0),
        }
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::NOT_SPECIFIED
    }
}

impl BitOr for JobState {
    type Output = JobState;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks() {
        assert!(JobState::RUNNING.matches(JobState::ALL));
        assert!(JobState::COMPLETED.matches(JobState::ALL));
        assert!(!JobState::NOT_SPECIFIED.matches(JobState::ALL));
        assert!(JobState::PAUSED.is_active());
        assert!(!JobState::CANCELED.is_active());
        assert!(JobState::CANCELED.is_terminal());
        assert!(!JobState::RUNNING.is_terminal());
        assert_eq!((JobState::RUNNING | JobState::PAUSED), JobState::ACTIVE);
    }
}
