//! Resource filtering and file synchronization engine for k8s-sidecar
//!
//! Mirrors labelled ConfigMaps and Secrets onto a directory tree:
//!
//! - **Filtering**: label, label-value and kind checks on every event
//! - **Path resolution**: target directory overrides and unique filenames
//! - **Synchronization**: digest-compared writes, Secret decoding, file modes
//! - **Drivers**: event-by-event reconciliation (watch) and a bounded,
//!   retried enumeration pass (list)
//!
//! # Architecture
//!
//! ```text
//!   EventSource ──> ReconciliationDriver ──> ResourceFilter
//!                          │                      │
//!   ResourceLister ──> BoundedEnumerator          ▼
//!                                           PathResolver
//!                                                 │
//!                                       ContentSynchronizer
//!                                                 │
//!                                             sidecar-fs
//! ```
//!
//! The engine owns no transport. Hosts implement [`EventSource`] and
//! [`ResourceLister`] over whatever client they have.

pub mod config;
pub mod driver;
pub mod enumerate;
pub mod error;
pub mod filter;
pub mod resolver;
pub mod resource;
pub mod retry;
pub mod source;
pub mod sync;
pub mod watch;

pub use config::{
    DEFAULT_FOLDER_ANNOTATION, FileMode, Method, NamespaceScope, ResourceSelection, ScopeConfig,
};
pub use driver::{Dispatch, EventHandler, ReconciliationDriver};
pub use enumerate::{BoundedEnumerator, ListSummary};
pub use error::{Error, Result};
pub use filter::{EventClass, ResourceFilter};
pub use resolver::PathResolver;
pub use resource::{ChangeEvent, EventKind, Resource, ResourceKind};
pub use retry::{DelayStrategy, RetryPolicy};
pub use source::{BoxError, EventSource, EventStream, ResourceLister, SourceError};
pub use sync::{ContentSynchronizer, SyncFailure, SyncReport, SyncTarget, WriteOutcome};
pub use watch::{StopHandle, WatchHandle, WatchSummary, spawn_watch};
