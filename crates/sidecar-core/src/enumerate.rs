//! List-mode enumeration
//!
//! One pass over every namespace in scope: fetch the in-scope ConfigMaps
//! and/or Secrets and run each through the same filter and synchronizer as
//! a `Created` event. Nothing is deleted in this mode.

use std::sync::Arc;

use tracing::{info, warn};

use crate::Result;
use crate::config::ScopeConfig;
use crate::driver::{Dispatch, EventHandler, ReconciliationDriver};
use crate::resource::ChangeEvent;
use crate::retry::RetryPolicy;
use crate::source::ResourceLister;
use crate::sync::SyncReport;

/// Totals for one list-mode pass.
#[derive(Debug, Default)]
pub struct ListSummary {
    /// Resources returned by the lister
    pub found: usize,
    pub out_of_scope: usize,
    pub report: SyncReport,
}

/// Enumerates in-scope resources once, with bounded retries per call.
pub struct BoundedEnumerator<L, H> {
    config: Arc<ScopeConfig>,
    lister: L,
    driver: ReconciliationDriver<H>,
    policy: RetryPolicy,
}

impl<L, H> BoundedEnumerator<L, H>
where
    L: ResourceLister,
    H: EventHandler,
{
    pub fn new(
        config: Arc<ScopeConfig>,
        lister: L,
        driver: ReconciliationDriver<H>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            config,
            lister,
            driver,
            policy,
        }
    }

    pub fn lister(&self) -> &L {
        &self.lister
    }

    /// Run the pass.
    ///
    /// # Errors
    ///
    /// Fails only when an enumeration call exhausts its retries or hits a
    /// non-retryable error. Per-key failures end up in the summary's report.
    pub async fn run(&self) -> Result<ListSummary> {
        let mut summary = ListSummary::default();
        let selector = self.config.label_selector();
        let namespaces = self.config.namespace.targets();

        for &kind in self.config.resource.kinds() {
            info!("Looking for {}s...", kind.lowercase());
            let mut found_of_kind = 0;

            for &namespace in &namespaces {
                if let Some(ns) = namespace {
                    info!(namespace = ns, "Searching in namespace {}", ns);
                }

                let operation = format!(
                    "listing {}s in {}",
                    kind.lowercase(),
                    namespace.unwrap_or("all namespaces")
                );
                let lister = &self.lister;
                let label_selector = selector.as_str();
                let resources = self
                    .policy
                    .run(&operation, move || {
                        lister.list(kind, namespace, label_selector)
                    })
                    .await?;

                found_of_kind += resources.len();
                for resource in resources {
                    match self.driver.handle(&ChangeEvent::created(resource)) {
                        Dispatch::OutOfScope => summary.out_of_scope += 1,
                        Dispatch::Synced(report) | Dispatch::Deleted(report) => {
                            summary.report.merge(report)
                        }
                    }
                }
            }

            if found_of_kind == 0 {
                info!("No {}s found with label {}", kind.lowercase(), selector);
            }
            summary.found += found_of_kind;
        }

        if summary.found == 0 {
            warn!(
                "Could not find configmaps OR secrets matching label {}. Was this intended?",
                selector
            );
        }
        info!(
            found = summary.found,
            written = summary.report.written.len(),
            unchanged = summary.report.unchanged.len(),
            failures = summary.report.failures.len(),
            "LIST mode completed"
        );
        Ok(summary)
    }
}
