//! Error types for ally.
//!
//! [`AllyError`] is the error surfaced by application setup and by the
//! services processors call. Each error has an [`ErrorCategory`] that maps to
//! an HTTP status code.
//!
//! | `ErrorCategory` | Status |
//! |---|---|
//! | `Input` | 400 Bad Request |
//! | `NotFound` | 404 Not Found |
//! | `Conflict` | 409 Conflict |
//! | `Development` | 500 Internal Server Error |
//! | `Internal` | 500 Internal Server Error |

use crate::api::InputError;
use crate::di::InjectionError;
use ally_design::{ChainError, ResolveError};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`AllyError`].
pub type AllyResult<T> = Result<T, AllyError>;

/// Categories of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The caller supplied invalid input.
    Input,
    /// A resource does not exist.
    NotFound,
    /// A resource conflicts with an existing one.
    Conflict,
    /// The application is misconfigured.
    Development,
    /// Any other failure.
    Internal,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Input => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Development | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for ally.
///
/// ```
/// use ally_core::{AllyError, ErrorCategory};
///
/// let err = AllyError::not_found("no user 42");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Error, Debug)]
pub enum AllyError {
    /// The caller supplied invalid input.
    #[error(transparent)]
    Input(#[from] InputError),

    /// A resource does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// A resource conflicts with an existing one.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
    },

    /// The application is misconfigured.
    #[error("Development error: {message}")]
    Devel {
        /// Human-readable error message.
        message: String,
    },

    /// A dependency could not be injected.
    #[error(transparent)]
    Injection(#[from] InjectionError),

    /// Processor declarations could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A chain execution failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Any other failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl AllyError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a development error.
    #[must_use]
    pub fn devel(message: impl Into<String>) -> Self {
        Self::Devel {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Input(_) => ErrorCategory::Input,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Devel { .. } | Self::Injection(_) | Self::Resolve(_) => {
                ErrorCategory::Development
            }
            Self::Chain(_) | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }
}
