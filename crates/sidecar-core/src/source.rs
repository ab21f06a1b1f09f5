//! Seams to the external watch/list transport
//!
//! The engine never talks to the cluster itself. A host wires a concrete
//! transport in through [`EventSource`] (watch mode) and [`ResourceLister`]
//! (list mode).

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::resource::{ChangeEvent, Resource, ResourceKind};

/// Boxed error carried by [`SourceError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a transport.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or API failure that may succeed on a later attempt
    #[error("transient transport failure: {0}")]
    Transient(#[source] BoxError),

    /// Client construction or request error that retrying cannot fix
    #[error("client failure: {0}")]
    Permanent(#[source] BoxError),
}

impl SourceError {
    pub fn transient(error: impl Into<BoxError>) -> Self {
        Self::Transient(error.into())
    }

    pub fn permanent(error: impl Into<BoxError>) -> Self {
        Self::Permanent(error.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Stream of change notifications from an established subscription.
///
/// The stream ends when the source shuts down. Items that are errors are
/// logged by the watch loop; reconnecting is the source's business.
pub type EventStream = BoxStream<'static, Result<ChangeEvent, SourceError>>;

/// Push-style source of change notifications.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Establish the subscription. Returning `Ok` means events will flow.
    async fn subscribe(&self) -> Result<EventStream, SourceError>;
}

/// Pull-style enumeration of the resources currently in the cluster.
#[async_trait]
pub trait ResourceLister: Send + Sync {
    /// List resources of `kind` matching `selector`, in `namespace` or in
    /// the whole cluster when `namespace` is `None`.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: &str,
    ) -> Result<Vec<Resource>, SourceError>;
}
