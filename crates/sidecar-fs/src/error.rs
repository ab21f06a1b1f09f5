//! Error types for sidecar-fs

use std::path::PathBuf;

/// Result type for sidecar-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sidecar-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Insufficient privileges for {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Invalid file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: &'static str },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    #[error("{operation} is not supported on this platform")]
    Unsupported { operation: &'static str },
}

impl Error {
    /// Wrap an I/O error, promoting permission failures to their own variant.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io { path, source }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}
