//! k8s-sidecar
//!
//! Mirrors labelled ConfigMaps and Secrets into a local directory, either
//! continuously (WATCH) or in a single pass (LIST).

mod cli;
mod error;
mod kube_source;
mod logging;
mod settings;

use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use sidecar_core::sync::prepare_directory;
use sidecar_core::{
    BoundedEnumerator, ContentSynchronizer, Method, ReconciliationDriver, RetryPolicy,
    ScopeConfig, spawn_watch,
};
use tracing::{info, warn};

use cli::Cli;
use error::Result;
use kube_source::KubeSource;
use settings::Settings;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbosity())?;

    let settings = cli.into_settings()?;
    settings.log_summary();

    // Non-fatal: failures are logged and retried per event
    let _ = prepare_directory(&settings.scope.folder);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(settings))
}

async fn serve(settings: Settings) -> Result<()> {
    let scope = Arc::new(settings.scope);
    let source = KubeSource::connect(Arc::clone(&scope), settings.timeouts).await?;
    let driver = driver(&scope);

    match settings.method {
        Method::List => {
            let enumerator =
                BoundedEnumerator::new(scope, source, driver, RetryPolicy::default());
            let summary = enumerator.run().await?;
            if !summary.report.is_clean() {
                warn!(
                    failures = summary.report.failures.len(),
                    "Some keys could not be written"
                );
            }
            Ok(())
        }
        Method::Watch => {
            // Only list mode gives up; a watch waits for the API to come back
            let mut handle = spawn_watch(source, driver, RetryPolicy::reconnecting());
            let stop = handle.stopper();
            tokio::spawn(async move {
                shutdown_signal().await;
                info!("Shutdown requested");
                stop.stop();
            });

            handle.ready().await?;
            let summary = handle.join().await?;
            info!(
                handled = summary.handled,
                stopped = summary.stopped,
                "Exiting"
            );
            Ok(())
        }
    }
}

fn driver(scope: &Arc<ScopeConfig>) -> ReconciliationDriver<ContentSynchronizer> {
    ReconciliationDriver::new(
        Arc::clone(scope),
        ContentSynchronizer::new(Arc::clone(scope)),
    )
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
