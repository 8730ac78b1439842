//! Synchronization errors.

use ally_design::{ContextError, ProcessError};
use thiserror::Error;

/// Result type of the ACL services.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while synchronizing configuration with the database.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A service call failed.
    #[error("{service} service failed: {message}")]
    Service {
        /// The service name.
        service: &'static str,
        /// What went wrong.
        message: String,
    },

    /// A repository context could not be read.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl SyncError {
    /// Creates a service error.
    #[must_use]
    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            service,
            message: message.into(),
        }
    }
}

impl From<SyncError> for ProcessError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Context(err) => Self::Context(err),
            other => Self::Other(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = SyncError::service("group", "connection refused");
        assert_eq!(err.to_string(), "group service failed: connection refused");
        assert!(matches!(ProcessError::from(err), ProcessError::Other(_)));
    }
}
