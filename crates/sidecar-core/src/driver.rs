//! Event dispatch
//!
//! [`ReconciliationDriver`] takes one [`ChangeEvent`] at a time, re-checks it
//! against the scope and hands it to the matching [`EventHandler`] method.
//! There is no queue: an event is finished before the next one is accepted.

use std::sync::Arc;

use tracing::debug;

use crate::config::ScopeConfig;
use crate::filter::{EventClass, ResourceFilter};
use crate::resource::ChangeEvent;
use crate::sync::SyncReport;

/// Receives in-scope events, one method per event category.
pub trait EventHandler: Send + Sync {
    /// Created, updated, resumed, or already-existing resources
    fn on_create_or_update(&self, event: &ChangeEvent) -> SyncReport;

    fn on_delete(&self, event: &ChangeEvent) -> SyncReport;
}

/// What the driver did with an event.
#[derive(Debug)]
pub enum Dispatch {
    OutOfScope,
    Synced(SyncReport),
    Deleted(SyncReport),
}

impl Dispatch {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::OutOfScope => None,
            Self::Synced(report) | Self::Deleted(report) => Some(report),
        }
    }
}

/// Filters events and routes them to a handler.
#[derive(Debug, Clone)]
pub struct ReconciliationDriver<H> {
    filter: ResourceFilter,
    handler: H,
}

impl<H: EventHandler> ReconciliationDriver<H> {
    pub fn new(config: Arc<ScopeConfig>, handler: H) -> Self {
        Self {
            filter: ResourceFilter::new(config),
            handler,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handle one event to completion.
    pub fn handle(&self, event: &ChangeEvent) -> Dispatch {
        let resource = &event.resource;
        match self.filter.route(event) {
            None => {
                debug!(
                    event = event.label(),
                    kind = %resource.kind,
                    namespace = resource.namespace_or_default(),
                    name = %resource.name,
                    "Resource out of scope, skipping"
                );
                Dispatch::OutOfScope
            }
            Some(EventClass::CreateOrUpdate) => {
                Dispatch::Synced(self.handler.on_create_or_update(event))
            }
            Some(EventClass::Delete) => Dispatch::Deleted(self.handler.on_delete(event)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl EventHandler for Recorder {
        fn on_create_or_update(&self, event: &ChangeEvent) -> SyncReport {
            self.calls
                .lock()
                .unwrap()
                .push(format!("cru:{}", event.resource.name));
            SyncReport::default()
        }

        fn on_delete(&self, event: &ChangeEvent) -> SyncReport {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete:{}", event.resource.name));
            SyncReport::default()
        }
    }

    fn driver() -> ReconciliationDriver<Recorder> {
        let config = ScopeConfig::new("sidecar", "/tmp/out")
            .unwrap()
            .with_label_value("yes");
        ReconciliationDriver::new(Arc::new(config), Recorder::default())
    }

    #[test]
    fn routes_by_event_class_and_skips_out_of_scope() {
        let driver = driver();
        let matching = Resource::config_map("ns", "a").with_label("sidecar", "yes");
        let wrong_value = Resource::config_map("ns", "b").with_label("sidecar", "no");

        assert!(matches!(
            driver.handle(&ChangeEvent::created(matching.clone())),
            Dispatch::Synced(_)
        ));
        assert!(matches!(
            driver.handle(&ChangeEvent::new(None, matching.clone())),
            Dispatch::Synced(_)
        ));
        assert!(matches!(
            driver.handle(&ChangeEvent::deleted(matching)),
            Dispatch::Deleted(_)
        ));
        assert!(matches!(
            driver.handle(&ChangeEvent::updated(wrong_value)),
            Dispatch::OutOfScope
        ));

        assert_eq!(
            *driver.handler().calls.lock().unwrap(),
            vec!["cru:a", "cru:a", "delete:a"]
        );
    }
}
