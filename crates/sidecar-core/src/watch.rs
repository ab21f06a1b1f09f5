//! Watch-mode background task
//!
//! [`spawn_watch`] runs the subscribe-then-dispatch loop on its own task and
//! hands back a [`WatchHandle`] with two signals:
//!
//! - **ready** fires once the subscription to the event source is established
//! - **stop** asks the loop to finish the in-flight event and return
//!
//! ```ignore
//! let mut handle = spawn_watch(source, driver, RetryPolicy::reconnecting());
//! let stop = handle.stopper();
//! tokio::spawn(async move {
//!     shutdown_signal().await;
//!     stop.stop();
//! });
//! handle.ready().await?;
//! let summary = handle.join().await?;
//! ```

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::driver::{Dispatch, EventHandler, ReconciliationDriver};
use crate::retry::RetryPolicy;
use crate::source::{EventSource, SourceError};
use crate::{Error, Result};

/// Counters for a finished watch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Events routed to a handler
    pub handled: usize,
    pub out_of_scope: usize,
    /// Error items yielded by the event stream
    pub source_errors: usize,
    /// Keys abandoned across all handled events
    pub key_failures: usize,
    /// Whether the loop ended because stop was requested
    pub stopped: bool,
}

impl WatchSummary {
    fn record(&mut self, dispatch: &Dispatch) {
        match dispatch.report() {
            None => self.out_of_scope += 1,
            Some(report) => {
                self.handled += 1;
                self.key_failures += report.failures.len();
            }
        }
    }
}

/// Cloneable trigger for the stop signal of a watch task.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<watch::Sender<bool>>);

impl StopHandle {
    /// Request an orderly shutdown. Idempotent.
    pub fn stop(&self) {
        let _ = self.0.send(true);
    }
}

/// Handle to a running watch task.
pub struct WatchHandle {
    ready: Option<oneshot::Receiver<()>>,
    stop: StopHandle,
    task: JoinHandle<Result<WatchSummary>>,
    finished: Option<Result<WatchSummary>>,
}

impl WatchHandle {
    /// Wait until the subscription is established.
    ///
    /// # Errors
    ///
    /// If subscribing failed, the task has already ended and its error is
    /// returned here.
    pub async fn ready(&mut self) -> Result<()> {
        let Some(ready) = self.ready.take() else {
            return Ok(());
        };

        if ready.await.is_ok() {
            return Ok(());
        }

        // Sender dropped without firing: the task ended before subscribing
        match join_task(&mut self.task).await {
            Ok(summary) => {
                self.finished = Some(Ok(summary));
                Ok(())
            }
            Err(e) => {
                self.finished = Some(Err(Error::Source(SourceError::permanent(
                    "watch task ended before subscribing",
                ))));
                Err(e)
            }
        }
    }

    /// Request an orderly shutdown. Idempotent.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Stop trigger that can be moved to another task, e.g. a signal listener.
    pub fn stopper(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the task to finish.
    pub async fn join(mut self) -> Result<WatchSummary> {
        match self.finished.take() {
            Some(outcome) => outcome,
            None => join_task(&mut self.task).await,
        }
    }
}

async fn join_task(task: &mut JoinHandle<Result<WatchSummary>>) -> Result<WatchSummary> {
    match task.await {
        Ok(result) => result,
        Err(join) => Err(Error::Source(SourceError::permanent(join.to_string()))),
    }
}

/// Spawn the watch loop on the current tokio runtime.
///
/// Subscribing is retried according to `policy`; with
/// [`RetryPolicy::reconnecting`] the task keeps trying until it subscribes or
/// is stopped. Once subscribed, stream errors are logged and skipped since
/// reconnecting is the source's job.
pub fn spawn_watch<S, H>(source: S, driver: ReconciliationDriver<H>, policy: RetryPolicy) -> WatchHandle
where
    S: EventSource + 'static,
    H: EventHandler + 'static,
{
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = watch::channel(false);

    let task = tokio::spawn(run_watch(source, driver, policy, ready_tx, stop_rx));

    WatchHandle {
        ready: Some(ready_rx),
        stop: StopHandle(Arc::new(stop_tx)),
        task,
        finished: None,
    }
}

async fn run_watch<S, H>(
    source: S,
    driver: ReconciliationDriver<H>,
    policy: RetryPolicy,
    ready: oneshot::Sender<()>,
    mut stop: watch::Receiver<bool>,
) -> Result<WatchSummary>
where
    S: EventSource,
    H: EventHandler,
{
    let mut summary = WatchSummary::default();

    let source = &source;
    let mut events = tokio::select! {
        subscribed = policy.run("subscribe", move || source.subscribe()) => subscribed?,
        _ = stop.wait_for(|stopped| *stopped) => {
            info!("Stop requested before the subscription was established");
            summary.stopped = true;
            return Ok(summary);
        }
    };
    info!("Subscription established, watching for changes");
    let _ = ready.send(());

    loop {
        tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => {
                info!("Stop requested, ending watch");
                summary.stopped = true;
                break;
            }
            next = events.next() => match next {
                None => {
                    info!("Event source closed");
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Event source reported an error");
                    summary.source_errors += 1;
                }
                Some(Ok(event)) => {
                    let dispatch = driver.handle(&event);
                    summary.record(&dispatch);
                }
            }
        }
    }

    info!(
        handled = summary.handled,
        out_of_scope = summary.out_of_scope,
        source_errors = summary.source_errors,
        key_failures = summary.key_failures,
        "Watch finished"
    );
    Ok(summary)
}
