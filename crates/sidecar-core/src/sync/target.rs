//! Per-key write target

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::config::FileMode;
use crate::resource::{Resource, ResourceKind};
use crate::{Error, Result};

/// Everything needed to materialize one data key. Built fresh for every key
/// of every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub directory: PathBuf,
    pub filename: String,
    /// Bytes to write; Secret values are already decoded
    pub content: Vec<u8>,
    pub mode: Option<FileMode>,
}

impl SyncTarget {
    /// # Errors
    ///
    /// Returns [`Error::Decode`] when a Secret value is not valid base64.
    pub fn new(
        resource: &Resource,
        directory: &Path,
        filename: &str,
        raw_content: &str,
        mode: Option<FileMode>,
    ) -> Result<Self> {
        Ok(Self {
            directory: directory.to_path_buf(),
            filename: filename.to_string(),
            content: decode_content(resource.kind, filename, raw_content)?,
            mode,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Secret values are stored base64-encoded; ConfigMap values are written as-is.
fn decode_content(kind: ResourceKind, key: &str, raw: &str) -> Result<Vec<u8>> {
    match kind {
        ResourceKind::ConfigMap => Ok(raw.as_bytes().to_vec()),
        ResourceKind::Secret => STANDARD.decode(raw.trim()).map_err(|e| Error::Decode {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}
