#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use sidecar_core::{
    ChangeEvent, ContentSynchronizer, DelayStrategy, EventSource, EventStream,
    ReconciliationDriver, Resource, ResourceKind, ResourceLister, RetryPolicy, ScopeConfig,
    SourceError,
};

pub const LABEL: &str = "sidecar";

pub fn scope(folder: &Path) -> ScopeConfig {
    ScopeConfig::new(LABEL, folder).unwrap()
}

pub fn driver(config: ScopeConfig) -> ReconciliationDriver<ContentSynchronizer> {
    let config = Arc::new(config);
    ReconciliationDriver::new(Arc::clone(&config), ContentSynchronizer::new(config))
}

pub fn labelled_config_map(name: &str) -> Resource {
    Resource::config_map("default", name).with_label(LABEL, "yes")
}

pub fn labelled_secret(name: &str) -> Resource {
    Resource::secret("default", name).with_label(LABEL, "yes")
}

/// Retry quickly so tests do not sleep for real.
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, DelayStrategy::Fixed(Duration::from_millis(5)))
}

/// Never give up, retrying quickly.
pub fn fast_reconnecting() -> RetryPolicy {
    RetryPolicy::persistent(DelayStrategy::Fixed(Duration::from_millis(2)))
}

/// Event source replaying a fixed list of events.
pub struct VecSource {
    events: Mutex<Option<Vec<Result<ChangeEvent, SourceError>>>>,
    /// Keep the stream open after the last event instead of ending it
    hold_open: bool,
    subscribe_failures: AtomicU32,
    permanent_failures: bool,
    pub subscribe_calls: Arc<AtomicU32>,
}

impl VecSource {
    pub fn new(events: Vec<ChangeEvent>) -> Self {
        Self::with_items(events.into_iter().map(Ok).collect())
    }

    pub fn with_items(items: Vec<Result<ChangeEvent, SourceError>>) -> Self {
        Self {
            events: Mutex::new(Some(items)),
            hold_open: false,
            subscribe_failures: AtomicU32::new(0),
            permanent_failures: false,
            subscribe_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Fail the first `count` subscribe calls with a transient error.
    pub fn failing_subscribes(self, count: u32) -> Self {
        self.subscribe_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Make subscribe failures permanent, as a denied RBAC check would be.
    pub fn permanently(mut self) -> Self {
        self.permanent_failures = true;
        self
    }
}

#[async_trait]
impl EventSource for VecSource {
    async fn subscribe(&self) -> Result<EventStream, SourceError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .subscribe_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(if self.permanent_failures {
                SourceError::permanent("configmaps is forbidden")
            } else {
                SourceError::transient("api server unavailable")
            });
        }

        let items = self.events.lock().unwrap().take().unwrap_or_default();
        let replay = stream::iter(items);
        if self.hold_open {
            Ok(replay.chain(stream::pending()).boxed())
        } else {
            Ok(replay.boxed())
        }
    }
}

/// Lister that fails a number of times before answering.
pub struct FlakyLister {
    pub calls: AtomicU32,
    failures: u32,
    permanent: bool,
    resources: Vec<Resource>,
    pub requests: Mutex<Vec<(ResourceKind, Option<String>, String)>>,
}

impl FlakyLister {
    pub fn answering(resources: Vec<Resource>) -> Self {
        Self {
            calls: AtomicU32::new(0),
            failures: 0,
            permanent: false,
            resources,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::answering(Vec::new()).failing(u32::MAX)
    }

    pub fn failing(mut self, failures: u32) -> Self {
        self.failures = failures;
        self
    }

    pub fn permanently(mut self) -> Self {
        self.permanent = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceLister for FlakyLister {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Vec<Resource>, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((
            kind,
            namespace.map(str::to_string),
            selector.to_string(),
        ));

        if call < self.failures {
            return Err(if self.permanent {
                SourceError::permanent("invalid kubeconfig")
            } else {
                SourceError::transient("connection reset by peer")
            });
        }

        Ok(self
            .resources
            .iter()
            .filter(|r| r.kind == kind)
            .filter(|r| namespace.is_none() || r.namespace.as_deref() == namespace)
            .cloned()
            .collect())
    }
}
