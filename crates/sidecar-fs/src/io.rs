//! Atomic I/O operations with file locking
//!
//! [`write_atomic`] stages content in a hidden sibling file named
//! `.{name}.{pid}.tmp` and renames it over the target. Tools watching the
//! directory will briefly see that file appear and vanish; consumers should
//! ignore dotfiles or match on the final name only.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

/// Outcome of [`ensure_dir`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirStatus {
    Created,
    Existing,
}

/// Outcome of [`remove_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Nothing was at the path
    Missing,
}

/// How [`write_atomic`] chose the permissions of the file it wrote
#[derive(Debug)]
pub enum ModeOutcome {
    /// The requested bits were set before any content was written
    Applied,
    /// No mode requested; the replaced file's permissions were carried over
    Preserved,
    /// No mode requested and no file replaced; the process umask decides
    Default,
    /// The requested bits could not be set. The content was still written.
    Failed(Error),
}

impl ModeOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Create a directory and its parents if it does not exist yet.
pub fn ensure_dir(path: &Path) -> Result<DirStatus> {
    if path.is_dir() {
        return Ok(DirStatus::Existing);
    }

    match fs::create_dir_all(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Created directory");
            Ok(DirStatus::Created)
        }
        // Lost a race with another creator
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => {
            Ok(DirStatus::Existing)
        }
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so a reader never observes a partially
/// written file. The parent directory must already exist.
///
/// Permissions are settled on the staging file before content is written:
/// `mode` when given, otherwise those of the file being replaced. A file
/// therefore never becomes visible, even briefly, with looser bits than
/// requested.
pub fn write_atomic(path: &Path, content: &[u8], mode: Option<u32>) -> Result<ModeOutcome> {
    let temp_path = staging_path(path)?;
    let mut temp_file = open_staging(&temp_path, mode)?;

    let permissions = stage_permissions(path, &temp_path, mode);
    let staged = stage(&mut temp_file, path, &temp_path, content);
    drop(temp_file);
    if let Err(e) = staged {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(path, e)
    })?;
    Ok(permissions)
}

/// Hidden sibling of `path` that [`write_atomic`] stages content in.
///
/// Same directory keeps the rename on one filesystem.
pub fn staging_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidFileName {
            name: path.display().to_string(),
            reason: "path has no file name",
        })?;

    Ok(path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id())))
}

fn open_staging(temp_path: &Path, mode: Option<u32>) -> Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    // Created no looser than requested; the umask can only narrow it
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Some(bits) = mode {
            options.mode(bits);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    options.open(temp_path).map_err(|e| Error::io(temp_path, e))
}

fn stage_permissions(path: &Path, temp_path: &Path, mode: Option<u32>) -> ModeOutcome {
    if let Some(bits) = mode {
        return match set_mode(temp_path, bits) {
            Ok(()) => ModeOutcome::Applied,
            Err(e) => ModeOutcome::Failed(e),
        };
    }

    let Ok(existing) = fs::metadata(path) else {
        return ModeOutcome::Default;
    };
    match fs::set_permissions(temp_path, existing.permissions()) {
        Ok(()) => ModeOutcome::Preserved,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Could not carry permissions over");
            ModeOutcome::Default
        }
    }
}

fn stage(file: &mut fs::File, path: &Path, temp_path: &Path, content: &[u8]) -> Result<()> {
    file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    file.write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;
    file.sync_all().map_err(|e| Error::io(temp_path, e))?;

    file.unlock().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })
}

/// Remove a file, reporting a missing file as an outcome rather than an error.
pub fn remove_file(path: &Path) -> Result<RemoveOutcome> {
    match fs::remove_file(path) {
        Ok(()) => Ok(RemoveOutcome::Removed),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(RemoveOutcome::Missing),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Apply permission bits (e.g. `0o644`) to a file.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::io(path, e))
}

/// Apply permission bits (e.g. `0o644`) to a file.
#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Err(Error::Unsupported {
        operation: "setting file modes",
    })
}
