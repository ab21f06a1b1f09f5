//! Error types for sidecar-core

use std::path::PathBuf;

use crate::source::SourceError;

/// Result type for sidecar-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sidecar-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required setting was not provided
    #[error("{field} is required")]
    MissingConfig { field: &'static str },

    /// A setting was provided but could not be interpreted
    #[error("Invalid value {value:?} for {field}: {message}")]
    InvalidConfig {
        field: &'static str,
        value: String,
        message: String,
    },

    /// Secret content was not valid base64
    #[error("Failed to decode content of key {key}: {message}")]
    Decode { key: String, message: String },

    /// The target directory for a resource could not be created
    #[error("Target directory {path} unavailable: {message}")]
    DirectoryUnavailable { path: PathBuf, message: String },

    /// Enumeration or subscription kept failing until the retry budget ran out
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: SourceError,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from sidecar-fs
    #[error(transparent)]
    Fs(#[from] sidecar_fs::Error),

    /// Non-retryable failure from the event source or lister
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl Error {
    pub(crate) fn invalid(
        field: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}
