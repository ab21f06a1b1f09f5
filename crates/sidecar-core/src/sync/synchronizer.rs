//! ContentSynchronizer implementation
//!
//! Turns the data keys of a resource into files. A write only happens when
//! the content digest differs from what is already on disk, so consumers
//! watching the directory are not woken by no-op updates.

use std::path::Path;
use std::sync::Arc;

use sidecar_fs::{DirStatus, ModeOutcome, RemoveOutcome, io, validate_file_name};
use tracing::{debug, error, info};

use crate::config::ScopeConfig;
use crate::driver::EventHandler;
use crate::resolver::PathResolver;
use crate::resource::{ChangeEvent, Resource};
use crate::{Error, Result};

use super::report::{SyncReport, WriteOutcome};
use super::target::SyncTarget;

/// Writes and removes the files backing a resource's data keys.
#[derive(Debug, Clone)]
pub struct ContentSynchronizer {
    config: Arc<ScopeConfig>,
    resolver: PathResolver,
}

impl ContentSynchronizer {
    pub fn new(config: Arc<ScopeConfig>) -> Self {
        let resolver = PathResolver::new(Arc::clone(&config));
        Self { config, resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Synchronize every data key of `resource`.
    ///
    /// Keys are independent: a failure on one is recorded in the report and
    /// the remaining keys are still processed. If the target directory
    /// cannot be created, every key is abandoned for this event.
    pub fn sync_resource(&self, resource: &Resource, event: &str) -> SyncReport {
        let mut report = SyncReport::default();
        let directory = self.resolver.directory(resource);

        if let Err(e) = prepare_directory(&directory) {
            for key in resource.data.keys() {
                report.record_failure(
                    key.as_str(),
                    Error::DirectoryUnavailable {
                        path: directory.clone(),
                        message: e.to_string(),
                    },
                );
            }
            return report;
        }

        for (key, raw_content) in &resource.data {
            let filename = self.resolver.filename(resource, key);
            match self.sync(resource, event, &directory, &filename, raw_content) {
                Ok(outcome) => report.record_write(outcome),
                Err(e) => {
                    error!(
                        event,
                        kind = %resource.kind,
                        namespace = resource.namespace_or_default(),
                        name = %resource.name,
                        filename = %filename,
                        error = %e,
                        "Failed to synchronize key"
                    );
                    report.record_failure(key.as_str(), e);
                }
            }
        }
        report
    }

    /// Bring `{directory}/{filename}` in line with `raw_content`.
    ///
    /// The directory must already exist.
    pub fn sync(
        &self,
        resource: &Resource,
        event: &str,
        directory: &Path,
        filename: &str,
        raw_content: &str,
    ) -> Result<WriteOutcome> {
        validate_file_name(filename)?;
        let target = SyncTarget::new(
            resource,
            directory,
            filename,
            raw_content,
            self.config.default_file_mode,
        )?;
        let path = target.path();

        if path.exists() {
            let current = sidecar_fs::compute_file_checksum(&path)
                .map_err(|e| sidecar_fs::Error::io(&path, e))?;
            if current == sidecar_fs::compute_content_checksum(&target.content) {
                info!(
                    event,
                    kind = %resource.kind,
                    path = %path.display(),
                    "Contents haven't changed. Not overwriting existing file"
                );
                return Ok(WriteOutcome::Unchanged { path });
            }
        }

        info!(
            event,
            kind = %resource.kind,
            path = %path.display(),
            "Writing content to file"
        );
        let permissions = io::write_atomic(&path, &target.content, target.mode.map(|m| m.bits()))?;

        let mode_applied = match permissions {
            ModeOutcome::Failed(e) => {
                if let Some(mode) = target.mode {
                    error!(path = %path.display(), mode = %mode, error = %e, "Failed to set file mode");
                }
                false
            }
            _ => true,
        };

        Ok(WriteOutcome::Written { path, mode_applied })
    }

    /// Remove the files of every data key `resource` carries at delete time.
    pub fn delete_resource(&self, resource: &Resource) -> SyncReport {
        let mut report = SyncReport::default();
        let directory = self.resolver.directory(resource);

        for key in resource.data.keys() {
            let filename = self.resolver.filename(resource, key);
            let path = directory.join(&filename);
            match self.delete(resource, &directory, &filename) {
                Ok(outcome) => report.record_removal(path, outcome),
                Err(e) => {
                    error!(
                        kind = %resource.kind,
                        namespace = resource.namespace_or_default(),
                        name = %resource.name,
                        path = %path.display(),
                        error = %e,
                        "Failed to delete file"
                    );
                    report.record_failure(key.as_str(), e);
                }
            }
        }
        report
    }

    /// Remove `{directory}/{filename}`. An already missing file is logged
    /// and reported, not raised.
    pub fn delete(
        &self,
        resource: &Resource,
        directory: &Path,
        filename: &str,
    ) -> Result<RemoveOutcome> {
        validate_file_name(filename)?;
        let path = directory.join(filename);

        info!(kind = %resource.kind, path = %path.display(), "Deleting file");
        let outcome = io::remove_file(&path)?;
        if outcome == RemoveOutcome::Missing {
            error!(kind = %resource.kind, path = %path.display(), "File not found");
        }
        Ok(outcome)
    }
}

impl EventHandler for ContentSynchronizer {
    fn on_create_or_update(&self, event: &ChangeEvent) -> SyncReport {
        self.sync_resource(&event.resource, event.label())
    }

    fn on_delete(&self, event: &ChangeEvent) -> SyncReport {
        self.delete_resource(&event.resource)
    }
}

/// Create the target directory if needed. Failures are logged here and
/// handed back so the caller can abandon the directory's keys.
pub fn prepare_directory(directory: &Path) -> sidecar_fs::Result<DirStatus> {
    match io::ensure_dir(directory) {
        Ok(DirStatus::Created) => {
            info!(path = %directory.display(), "Created folder");
            Ok(DirStatus::Created)
        }
        Ok(DirStatus::Existing) => {
            debug!(path = %directory.display(), "Folder already exists");
            Ok(DirStatus::Existing)
        }
        Err(e) if e.is_permission_denied() => {
            error!(path = %directory.display(), "Insufficient privileges to create folder");
            Err(e)
        }
        Err(e) => {
            error!(path = %directory.display(), error = %e, "Could not create folder");
            Err(e)
        }
    }
}
