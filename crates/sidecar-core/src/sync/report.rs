//! Per-event synchronization results

use std::path::PathBuf;

use sidecar_fs::RemoveOutcome;

use crate::Error;

/// Result of synchronizing a single data key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New content was written. `mode_applied` is false when a configured
    /// file mode could not be set.
    Written { path: PathBuf, mode_applied: bool },
    /// The file already held identical content; nothing was touched
    Unchanged { path: PathBuf },
}

/// A data key whose operation was abandoned.
#[derive(Debug)]
pub struct SyncFailure {
    pub key: String,
    pub error: Error,
}

/// What happened to every key of one event.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Files that were already gone at delete time
    pub missing: Vec<PathBuf>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn record_write(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Written { path, .. } => self.written.push(path),
            WriteOutcome::Unchanged { path } => self.unchanged.push(path),
        }
    }

    pub fn record_removal(&mut self, path: PathBuf, outcome: RemoveOutcome) {
        match outcome {
            RemoveOutcome::Removed => self.removed.push(path),
            RemoveOutcome::Missing => self.missing.push(path),
        }
    }

    pub fn record_failure(&mut self, key: impl Into<String>, error: Error) {
        self.failures.push(SyncFailure {
            key: key.into(),
            error,
        });
    }

    /// True when no key was abandoned.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: SyncReport) {
        self.written.extend(other.written);
        self.unchanged.extend(other.unchanged);
        self.removed.extend(other.removed);
        self.missing.extend(other.missing);
        self.failures.extend(other.failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_accumulates_every_bucket() {
        let mut total = SyncReport::default();
        let mut one = SyncReport::default();
        one.record_write(WriteOutcome::Written {
            path: "/a".into(),
            mode_applied: true,
        });
        one.record_removal("/b".into(), RemoveOutcome::Missing);
        let mut two = SyncReport::default();
        two.record_write(WriteOutcome::Unchanged { path: "/c".into() });
        two.record_failure(
            "d",
            Error::Decode {
                key: "d".into(),
                message: "bad".into(),
            },
        );

        total.merge(one);
        total.merge(two);

        assert_eq!(total.written, vec![PathBuf::from("/a")]);
        assert_eq!(total.unchanged, vec![PathBuf::from("/c")]);
        assert_eq!(total.missing, vec![PathBuf::from("/b")]);
        assert!(!total.is_clean());
    }
}
