//! Target path resolution

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ScopeConfig;
use crate::resource::Resource;

/// Computes where a data key of a resource lives on disk.
#[derive(Debug, Clone)]
pub struct PathResolver {
    config: Arc<ScopeConfig>,
}

impl PathResolver {
    pub fn new(config: Arc<ScopeConfig>) -> Self {
        Self { config }
    }

    /// Target directory for every key of `resource`.
    ///
    /// The override annotation, when present and non-empty, replaces the
    /// configured folder outright; the two are never joined.
    pub fn directory(&self, resource: &Resource) -> PathBuf {
        match resource.annotation(&self.config.folder_annotation) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => self.config.folder.clone(),
        }
    }

    /// File name for `key`, disambiguated as
    /// `{namespace}.{kind}_{name}.{key}` when unique filenames are enabled.
    pub fn filename(&self, resource: &Resource, key: &str) -> String {
        if !self.config.unique_filenames {
            return key.to_string();
        }

        format!(
            "{}.{}_{}.{}",
            resource.namespace_or_default(),
            resource.kind.lowercase(),
            resource.name,
            key
        )
    }

    pub fn resolve(&self, resource: &Resource, key: &str) -> (PathBuf, String) {
        (self.directory(resource), self.filename(resource, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use pretty_assertions::assert_eq;

    fn resolver(config: ScopeConfig) -> PathResolver {
        PathResolver::new(Arc::new(config))
    }

    fn base() -> ScopeConfig {
        ScopeConfig::new("sidecar", "/data/out").unwrap()
    }

    #[test]
    fn uses_raw_key_by_default() {
        let cm = Resource::config_map("ns", "cfg");
        assert_eq!(
            resolver(base()).resolve(&cm, "app.yaml"),
            (PathBuf::from("/data/out"), "app.yaml".to_string())
        );
    }

    #[test]
    fn unique_filenames_combine_namespace_kind_and_name() {
        let r = resolver(base().with_unique_filenames(true));

        let cm = Resource::config_map("ns", "cfg");
        assert_eq!(r.filename(&cm, "app.yaml"), "ns.configmap_cfg.app.yaml");

        let secret = Resource::secret("prod", "creds");
        assert_eq!(r.filename(&secret, "token"), "prod.secret_creds.token");
    }

    #[test]
    fn unique_filenames_default_the_namespace() {
        let r = resolver(base().with_unique_filenames(true));
        let cm = Resource::new(ResourceKind::ConfigMap, None, "cfg");
        assert_eq!(r.filename(&cm, "a.txt"), "default.configmap_cfg.a.txt");
    }

    #[test]
    fn annotation_replaces_folder_entirely() {
        let cm = Resource::config_map("ns", "cfg")
            .with_annotation("k8s-sidecar-target-directory", "/alt/dir");
        assert_eq!(resolver(base()).directory(&cm), PathBuf::from("/alt/dir"));
    }

    #[test]
    fn custom_annotation_key_is_honoured() {
        let cm = Resource::config_map("ns", "cfg")
            .with_annotation("k8s-sidecar-target-directory", "/ignored")
            .with_annotation("grafana_folder", "/dashboards/team");
        let r = resolver(base().with_folder_annotation("grafana_folder"));
        assert_eq!(r.directory(&cm), PathBuf::from("/dashboards/team"));
    }

    #[test]
    fn empty_annotation_falls_back_to_folder() {
        let cm = Resource::config_map("ns", "cfg")
            .with_annotation("k8s-sidecar-target-directory", "");
        assert_eq!(resolver(base()).directory(&cm), PathBuf::from("/data/out"));
    }
}
