use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Row key of a scheduled job; producers may pick their own, otherwise a v4 UUID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Empty or whitespace-only ids are rejected at schedule time
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pop receipt handed out with every claim; only the current holder can
/// extend or complete the iteration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PopReceipt(pub String);

impl PopReceipt {
    /// Fresh receipt for a new delivery
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for PopReceipt {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PopReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
