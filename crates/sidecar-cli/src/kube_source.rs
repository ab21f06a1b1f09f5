//! Kubernetes transport
//!
//! Implements the engine's [`EventSource`] and [`ResourceLister`] over a
//! `kube` client. One watch stream is opened per (kind, namespace) pair and
//! the streams are merged into a single event sequence.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{StreamExt, future, stream};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::ListParams;
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use sidecar_core::{
    ChangeEvent, EventSource, EventStream, Resource, ResourceKind, ResourceLister, ScopeConfig,
    SourceError,
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::settings::WatchTimeouts;

/// Longest watch timeout, in seconds, the client accepts for a single watch
/// request. The API server closes watches well before this anyway.
const MAX_WATCH_TIMEOUT: u32 = 290;

/// A Kubernetes object kind the sidecar mirrors.
trait Mirrored:
    kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + DeserializeOwned
    + Debug
    + Send
    + Sync
    + 'static
{
    const KIND: ResourceKind;

    fn into_resource(self) -> Resource;
}

impl Mirrored for ConfigMap {
    const KIND: ResourceKind = ResourceKind::ConfigMap;

    fn into_resource(self) -> Resource {
        from_parts(Self::KIND, self.metadata, self.data.unwrap_or_default())
    }
}

impl Mirrored for Secret {
    const KIND: ResourceKind = ResourceKind::Secret;

    /// The API hands Secret data over already decoded; re-encode it so the
    /// engine sees the same base64 text that is stored in the cluster.
    fn into_resource(self) -> Resource {
        let data = self
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, bytes)| (key, STANDARD.encode(bytes.0)))
            .collect();
        from_parts(Self::KIND, self.metadata, data)
    }
}

fn from_parts(kind: ResourceKind, meta: ObjectMeta, data: BTreeMap<String, String>) -> Resource {
    Resource {
        kind,
        namespace: meta.namespace,
        name: meta.name.unwrap_or_default(),
        labels: meta.labels,
        annotations: meta.annotations,
        data,
    }
}

/// Client and scope shared by the watch and list transports.
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
    scope: Arc<ScopeConfig>,
    watch_timeout: u32,
}

impl KubeSource {
    /// Build a client from the in-cluster environment or the local kubeconfig.
    pub async fn connect(scope: Arc<ScopeConfig>, timeouts: WatchTimeouts) -> Result<Self> {
        let mut config = kube::Config::infer().await?;
        config.read_timeout = Some(Duration::from_secs(u64::from(timeouts.client)));
        info!(cluster = %config.cluster_url, "Connecting to the Kubernetes API");

        Ok(Self {
            client: Client::try_from(config)?,
            scope,
            watch_timeout: watch_timeout(timeouts.server),
        })
    }

    fn api<K: Mirrored>(&self, namespace: Option<&str>) -> Api<K> {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    async fn list_kind<K: Mirrored>(
        &self,
        namespace: Option<&str>,
        selector: &str,
    ) -> std::result::Result<Vec<Resource>, SourceError> {
        let params = ListParams::default().labels(selector);
        let list = self
            .api::<K>(namespace)
            .list(&params)
            .await
            .map_err(classify)?;
        Ok(list.items.into_iter().map(K::into_resource).collect())
    }

    async fn watch_kind<K: Mirrored>(
        &self,
        namespace: Option<&str>,
        selector: &str,
    ) -> std::result::Result<EventStream, SourceError> {
        let api = self.api::<K>(namespace);

        // The watcher retries silently on its own; list once so bad
        // credentials or missing RBAC surface as a logged subscribe failure.
        api.list(&ListParams::default().labels(selector).limit(1))
            .await
            .map_err(classify)?;

        let config = watch_config(selector, self.watch_timeout);
        let mut seen = SeenSet::default();

        let events = watcher(api, config)
            .default_backoff()
            .filter_map(move |item| future::ready(seen.translate(item)));

        debug!(
            kind = %K::KIND,
            namespace = namespace.unwrap_or("all namespaces"),
            selector,
            "Watch stream opened"
        );
        Ok(events.boxed())
    }
}

#[async_trait]
impl EventSource for KubeSource {
    async fn subscribe(&self) -> std::result::Result<EventStream, SourceError> {
        let selector = self.scope.label_selector();
        let mut streams = Vec::new();

        for &kind in self.scope.resource.kinds() {
            for namespace in self.scope.namespace.targets() {
                let stream = match kind {
                    ResourceKind::ConfigMap => {
                        self.watch_kind::<ConfigMap>(namespace, &selector).await?
                    }
                    ResourceKind::Secret => self.watch_kind::<Secret>(namespace, &selector).await?,
                };
                streams.push(stream);
            }
        }

        Ok(stream::select_all(streams).boxed())
    }
}

#[async_trait]
impl ResourceLister for KubeSource {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: &str,
    ) -> std::result::Result<Vec<Resource>, SourceError> {
        match kind {
            ResourceKind::ConfigMap => self.list_kind::<ConfigMap>(namespace, selector).await,
            ResourceKind::Secret => self.list_kind::<Secret>(namespace, selector).await,
        }
    }
}

/// Server-side timeout for each watch request, clamped to what the client
/// will send.
fn watch_timeout(server: u32) -> u32 {
    if server > MAX_WATCH_TIMEOUT {
        warn!(
            "WATCH_SERVER_TIMEOUT of {} seconds exceeds the {} second watch limit; using {} seconds",
            server, MAX_WATCH_TIMEOUT, MAX_WATCH_TIMEOUT
        );
        MAX_WATCH_TIMEOUT
    } else {
        server
    }
}

fn watch_config(selector: &str, timeout: u32) -> watcher::Config {
    watcher::Config::default().labels(selector).timeout(timeout)
}

/// Objects a single watch stream has reported, keyed by namespace and name.
///
/// The watcher only says "applied"; whether that is a creation or an update
/// depends on whether the object was seen before.
#[derive(Debug, Default)]
struct SeenSet(HashSet<(Option<String>, String)>);

impl SeenSet {
    fn translate<K: Mirrored>(
        &mut self,
        item: std::result::Result<watcher::Event<K>, watcher::Error>,
    ) -> Option<std::result::Result<ChangeEvent, SourceError>> {
        let event = match item {
            Ok(event) => event,
            Err(e) => return Some(Err(SourceError::transient(e))),
        };

        let change = match event {
            watcher::Event::Init | watcher::Event::InitDone => return None,
            watcher::Event::InitApply(object) => {
                let resource = object.into_resource();
                self.0.insert(key_of(&resource));
                ChangeEvent::resumed(resource)
            }
            watcher::Event::Apply(object) => {
                let resource = object.into_resource();
                if self.0.insert(key_of(&resource)) {
                    ChangeEvent::created(resource)
                } else {
                    ChangeEvent::updated(resource)
                }
            }
            watcher::Event::Delete(object) => {
                let resource = object.into_resource();
                self.0.remove(&key_of(&resource));
                ChangeEvent::deleted(resource)
            }
        };
        Some(Ok(change))
    }
}

fn key_of(resource: &Resource) -> (Option<String>, String) {
    (resource.namespace.clone(), resource.name.clone())
}

/// Client-side and server-side faults are worth retrying; rejected requests
/// are not.
fn classify(error: kube::Error) -> SourceError {
    let rejected = matches!(
        &error,
        kube::Error::Api(response) if is_permanent_status(response.code)
    );
    if rejected {
        SourceError::permanent(error)
    } else {
        SourceError::transient(error)
    }
}

fn is_permanent_status(code: u16) -> bool {
    matches!(code, 400 | 401 | 403 | 404 | 405 | 422)
}
