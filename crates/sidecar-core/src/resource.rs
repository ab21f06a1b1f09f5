//! Typed view of the cluster objects the sidecar mirrors
//!
//! A [`Resource`] is a snapshot of a ConfigMap or Secret as delivered by the
//! event source. Labels, annotations and namespace are explicitly optional:
//! a resource without a `labels` mapping is a distinct state, not a lookup
//! failure.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a mirrored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
}

impl ResourceKind {
    /// The kind as the API server spells it (`ConfigMap`, `Secret`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
        }
    }

    /// Lower-cased kind, used for filtering and unique filenames.
    pub fn lowercase(&self) -> &'static str {
        match self {
            Self::ConfigMap => "configmap",
            Self::Secret => "secret",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a ConfigMap or Secret.
///
/// For Secrets every value in `data` is base64 text, exactly as stored in the
/// cluster; decoding happens at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    #[serde(default)]
    pub namespace: Option<String>,
    pub name: String,
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub annotations: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(kind: ResourceKind, namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.map(str::to_string),
            name: name.into(),
            labels: None,
            annotations: None,
            data: BTreeMap::new(),
        }
    }

    pub fn config_map(namespace: &str, name: impl Into<String>) -> Self {
        Self::new(ResourceKind::ConfigMap, Some(namespace), name)
    }

    pub fn secret(namespace: &str, name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Secret, Some(namespace), name)
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, content: impl Into<String>) -> Self {
        self.data.insert(key.into(), content.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.as_ref()?.get(key).map(String::as_str)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.as_ref()?.get(key).map(String::as_str)
    }

    /// Namespace used in unique filenames; `default` when none is recorded.
    pub fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().unwrap_or("default")
    }
}

/// Kind of change reported by the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Updated,
    Resumed,
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "create",
            Self::Updated => "update",
            Self::Resumed => "resume",
            Self::Deleted => "delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource snapshot plus the change that produced it.
///
/// `kind` is `None` when the source observed the resource without a change,
/// e.g. one that already existed when the process started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(default)]
    pub kind: Option<EventKind>,
    pub resource: Resource,
}

impl ChangeEvent {
    pub fn new(kind: Option<EventKind>, resource: Resource) -> Self {
        Self { kind, resource }
    }

    pub fn created(resource: Resource) -> Self {
        Self::new(Some(EventKind::Created), resource)
    }

    pub fn updated(resource: Resource) -> Self {
        Self::new(Some(EventKind::Updated), resource)
    }

    pub fn resumed(resource: Resource) -> Self {
        Self::new(Some(EventKind::Resumed), resource)
    }

    pub fn deleted(resource: Resource) -> Self {
        Self::new(Some(EventKind::Deleted), resource)
    }

    /// Label used in log lines.
    pub fn label(&self) -> &'static str {
        self.kind.map(|k| k.as_str()).unwrap_or("existing")
    }
}
