//! Filesystem layer for the k8s-sidecar
//!
//! Thin, stateless operations used by the synchronizer: directory creation,
//! atomic writes, removal, permission changes and streamed checksums.

pub mod checksum;
pub mod error;
pub mod io;
pub mod name;

pub use checksum::{compute_content_checksum, compute_file_checksum};
pub use error::{Error, Result};
pub use io::{DirStatus, ModeOutcome, RemoveOutcome};
pub use name::validate_file_name;
