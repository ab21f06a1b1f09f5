//! Scope predicates
//!
//! The event source narrows its subscription with a label selector, but that
//! filter is coarse. Every resource is re-checked here before anything
//! touches the filesystem.

use std::sync::Arc;

use crate::config::ScopeConfig;
use crate::resource::{ChangeEvent, EventKind, Resource};

/// Which handler an in-scope event is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// Created, updated, resumed, or observed without a change kind
    CreateOrUpdate,
    Delete,
}

impl From<Option<EventKind>> for EventClass {
    fn from(kind: Option<EventKind>) -> Self {
        match kind {
            Some(EventKind::Deleted) => Self::Delete,
            Some(EventKind::Created | EventKind::Updated | EventKind::Resumed) | None => {
                Self::CreateOrUpdate
            }
        }
    }
}

/// Pure predicate over a resource and the configured scope.
#[derive(Debug, Clone)]
pub struct ResourceFilter {
    config: Arc<ScopeConfig>,
}

impl ResourceFilter {
    pub fn new(config: Arc<ScopeConfig>) -> Self {
        Self { config }
    }

    /// The resource carries the required label (and value, if one is configured).
    pub fn labels_match(&self, resource: &Resource) -> bool {
        let Some(labels) = &resource.labels else {
            return false;
        };

        match (&self.config.label_value, labels.get(&self.config.label)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(required), Some(actual)) => required == actual,
        }
    }

    pub fn kind_matches(&self, resource: &Resource) -> bool {
        self.config.resource.includes(resource.kind)
    }

    pub fn is_in_scope(&self, resource: &Resource) -> bool {
        self.labels_match(resource) && self.kind_matches(resource)
    }

    /// Route an event: `None` when it is out of scope.
    pub fn route(&self, event: &ChangeEvent) -> Option<EventClass> {
        self.is_in_scope(&event.resource)
            .then(|| EventClass::from(event.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceSelection;
    use crate::resource::ResourceKind;
    use rstest::rstest;

    fn filter(config: ScopeConfig) -> ResourceFilter {
        ResourceFilter::new(Arc::new(config))
    }

    fn base() -> ScopeConfig {
        ScopeConfig::new("sidecar", "/tmp/out").unwrap()
    }

    #[test]
    fn missing_labels_mapping_is_out_of_scope() {
        let resource = Resource::config_map("ns", "cm");
        assert!(!filter(base()).is_in_scope(&resource));
    }

    #[test]
    fn label_presence_is_enough_without_required_value() {
        let resource = Resource::config_map("ns", "cm").with_label("sidecar", "anything");
        assert!(filter(base()).is_in_scope(&resource));
    }

    #[test]
    fn other_labels_do_not_satisfy_the_key() {
        let resource = Resource::config_map("ns", "cm").with_label("other", "1");
        assert!(!filter(base()).is_in_scope(&resource));
    }

    #[rstest]
    #[case("yes", true)]
    #[case("no", false)]
    #[case("Yes", false)]
    #[case("", false)]
    fn required_value_must_match_exactly(#[case] actual: &str, #[case] expected: bool) {
        let resource = Resource::config_map("ns", "cm").with_label("sidecar", actual);
        let f = filter(base().with_label_value("yes"));
        assert_eq!(f.is_in_scope(&resource), expected);
    }

    #[rstest]
    #[case(ResourceSelection::ConfigMap, ResourceKind::ConfigMap, true)]
    #[case(ResourceSelection::ConfigMap, ResourceKind::Secret, false)]
    #[case(ResourceSelection::Secret, ResourceKind::Secret, true)]
    #[case(ResourceSelection::Secret, ResourceKind::ConfigMap, false)]
    #[case(ResourceSelection::Both, ResourceKind::ConfigMap, true)]
    #[case(ResourceSelection::Both, ResourceKind::Secret, true)]
    fn kind_filter(
        #[case] selection: ResourceSelection,
        #[case] kind: ResourceKind,
        #[case] expected: bool,
    ) {
        let resource = Resource::new(kind, Some("ns"), "r").with_label("sidecar", "1");
        assert_eq!(
            filter(base().with_resource(selection)).is_in_scope(&resource),
            expected
        );
    }

    #[rstest]
    #[case(None, EventClass::CreateOrUpdate)]
    #[case(Some(EventKind::Created), EventClass::CreateOrUpdate)]
    #[case(Some(EventKind::Updated), EventClass::CreateOrUpdate)]
    #[case(Some(EventKind::Resumed), EventClass::CreateOrUpdate)]
    #[case(Some(EventKind::Deleted), EventClass::Delete)]
    fn event_classification(#[case] kind: Option<EventKind>, #[case] expected: EventClass) {
        assert_eq!(EventClass::from(kind), expected);
    }

    #[test]
    fn route_skips_out_of_scope_deletes() {
        let resource = Resource::config_map("ns", "cm").with_label("other", "1");
        assert_eq!(filter(base()).route(&ChangeEvent::deleted(resource)), None);
    }
}
