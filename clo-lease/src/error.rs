use thiserror::Error;

/// Result type for lease operations
pub type LeaseResult<T> = Result<T, LeaseError>;

/// Errors that can occur while acquiring or releasing a lease
#[derive(Error, Debug)]
pub enum LeaseError {
    #[error("Invalid lease request: {message}")]
    Invalid { message: String },

    #[error("Lease {lease_id} on '{blob}' is no longer held")]
    NotHeld { blob: String, lease_id: String },

    #[error("Lease backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl LeaseError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn not_held<S: Into<String>>(blob: S, lease_id: impl std::fmt::Display) -> Self {
        Self::NotHeld {
            blob: blob.into(),
            lease_id: lease_id.to_string(),
        }
    }
}
