//! Content delivery errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors of a content delivery manager.
#[derive(Debug, Error)]
pub enum CdmError {
    /// The path is not a valid repository path.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why the path is rejected.
        reason: &'static str,
    },

    /// Nothing is published at the path.
    #[error("no content published at '{path}'")]
    PathNotFound {
        /// The repository path.
        path: String,
    },

    /// The protocol is not supported.
    #[error("unsupported protocol '{0}'")]
    UnsupportedProtocol(String),

    /// The path pattern has no single `{}` placeholder.
    #[error("invalid path pattern '{0}', expected exactly one '{{}}'")]
    InvalidPattern(String),

    /// A file system operation failed.
    #[error("I/O error on {path}")]
    Io {
        /// The file system path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Metadata could not be read or written.
    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl CdmError {
    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// Creates a path not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Creates an I/O error for a file system path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
