//! Scope configuration
//!
//! [`ScopeConfig`] is built once at startup and shared read-only (behind an
//! `Arc`) by every component of the engine.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::resource::ResourceKind;
use crate::{Error, Result};

/// Annotation consulted for a per-resource target directory when none is configured.
pub const DEFAULT_FOLDER_ANNOTATION: &str = "k8s-sidecar-target-directory";

/// Which resource kinds are synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceSelection {
    #[default]
    ConfigMap,
    Secret,
    Both,
}

impl ResourceSelection {
    pub fn includes(&self, kind: ResourceKind) -> bool {
        match self {
            Self::Both => true,
            Self::ConfigMap => kind == ResourceKind::ConfigMap,
            Self::Secret => kind == ResourceKind::Secret,
        }
    }

    /// Kinds to enumerate, in a stable order.
    pub fn kinds(&self) -> &'static [ResourceKind] {
        match self {
            Self::ConfigMap => &[ResourceKind::ConfigMap],
            Self::Secret => &[ResourceKind::Secret],
            Self::Both => &[ResourceKind::ConfigMap, ResourceKind::Secret],
        }
    }
}

impl FromStr for ResourceSelection {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "configmap" => Ok(Self::ConfigMap),
            "secret" => Ok(Self::Secret),
            "both" => Ok(Self::Both),
            _ => Err(Error::invalid(
                "RESOURCE",
                s,
                "expected one of [configmap, secret, both]",
            )),
        }
    }
}

impl fmt::Display for ResourceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigMap => write!(f, "configmap"),
            Self::Secret => write!(f, "secret"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// How resources are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Continuous reconciliation from a watch subscription
    #[default]
    Watch,
    /// One enumeration pass, then exit
    List,
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Some charts pass an empty string instead of leaving the variable unset
        match s.trim().to_lowercase().as_str() {
            "" | "watch" => Ok(Self::Watch),
            "list" => Ok(Self::List),
            _ => Err(Error::invalid("METHOD", s, "expected WATCH or LIST")),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watch => write!(f, "WATCH"),
            Self::List => write!(f, "LIST"),
        }
    }
}

/// Namespaces the sidecar looks at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceScope {
    #[default]
    All,
    Only(Vec<String>),
}

impl NamespaceScope {
    /// Namespaces to query; `None` stands for the whole cluster.
    pub fn targets(&self) -> Vec<Option<&str>> {
        match self {
            Self::All => vec![None],
            Self::Only(names) => names.iter().map(|n| Some(n.as_str())).collect(),
        }
    }
}

impl FromStr for NamespaceScope {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim() == "ALL" {
            return Ok(Self::All);
        }

        let names: Vec<String> = s
            .split(',')
            .map(|n| n.replace(' ', ""))
            .filter(|n| !n.is_empty())
            .collect();

        if names.is_empty() {
            return Err(Error::invalid(
                "NAMESPACE",
                s,
                "expected ALL or a comma-separated list of namespaces",
            ));
        }
        Ok(Self::Only(names))
    }
}

impl fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::Only(names) => write!(f, "{}", names.join(",")),
        }
    }
}

/// Permission bits applied to every written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(u32);

impl FileMode {
    pub fn new(bits: u32) -> Result<Self> {
        if bits > 0o7777 {
            return Err(Error::invalid(
                "DEFAULT_FILE_MODE",
                format!("{:o}", bits),
                "permission bits must not exceed 7777",
            ));
        }
        Ok(Self(bits))
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl FromStr for FileMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits = s.trim();
        let digits = digits.strip_prefix("0o").unwrap_or(digits);
        let bits = u32::from_str_radix(digits, 8)
            .map_err(|e| Error::invalid("DEFAULT_FILE_MODE", s, e.to_string()))?;
        Self::new(bits)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// Immutable description of what the sidecar mirrors and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeConfig {
    /// Label key a resource must carry
    pub label: String,
    /// Exact value required under `label`, if any
    pub label_value: Option<String>,
    pub resource: ResourceSelection,
    /// Default target directory
    pub folder: PathBuf,
    /// Annotation whose value replaces `folder` for a single resource
    pub folder_annotation: String,
    pub unique_filenames: bool,
    pub default_file_mode: Option<FileMode>,
    pub namespace: NamespaceScope,
}

impl ScopeConfig {
    /// Create a configuration with the two required settings and defaults
    /// for everything else.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] if either value is empty.
    pub fn new(label: impl Into<String>, folder: impl Into<PathBuf>) -> Result<Self> {
        let label = label.into();
        let folder = folder.into();

        if label.trim().is_empty() {
            return Err(Error::MissingConfig { field: "LABEL" });
        }
        if folder.as_os_str().is_empty() {
            return Err(Error::MissingConfig { field: "FOLDER" });
        }

        Ok(Self {
            label,
            label_value: None,
            resource: ResourceSelection::default(),
            folder,
            folder_annotation: DEFAULT_FOLDER_ANNOTATION.to_string(),
            unique_filenames: false,
            default_file_mode: None,
            namespace: NamespaceScope::default(),
        })
    }

    pub fn with_label_value(mut self, value: impl Into<String>) -> Self {
        self.label_value = Some(value.into());
        self
    }

    pub fn with_resource(mut self, resource: ResourceSelection) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_folder_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.folder_annotation = annotation.into();
        self
    }

    pub fn with_unique_filenames(mut self, unique: bool) -> Self {
        self.unique_filenames = unique;
        self
    }

    pub fn with_default_file_mode(mut self, mode: FileMode) -> Self {
        self.default_file_mode = Some(mode);
        self
    }

    pub fn with_namespace(mut self, namespace: NamespaceScope) -> Self {
        self.namespace = namespace;
        self
    }

    /// Server-side label selector: `LABEL` or `LABEL=LABEL_VALUE`.
    pub fn label_selector(&self) -> String {
        match &self.label_value {
            Some(value) => format!("{}={}", self.label, value),
            None => self.label.clone(),
        }
    }
}
