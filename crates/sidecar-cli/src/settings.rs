//! Validated runtime settings

use sidecar_core::{Method, NamespaceScope, ScopeConfig};
use tracing::{info, warn};

pub const DEFAULT_WATCH_SERVER_TIMEOUT: u32 = 600;
pub const DEFAULT_WATCH_CLIENT_TIMEOUT: u32 = 660;

/// Timeouts for watch requests, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTimeouts {
    /// Asked of the API server for each watch request
    pub server: u32,
    /// Read timeout of the HTTP client
    pub client: u32,
}

impl Default for WatchTimeouts {
    fn default() -> Self {
        Self {
            server: DEFAULT_WATCH_SERVER_TIMEOUT,
            client: DEFAULT_WATCH_CLIENT_TIMEOUT,
        }
    }
}

impl WatchTimeouts {
    /// A client that gives up before the server closes the watch sees
    /// spurious disconnects.
    pub fn client_shorter_than_server(&self) -> bool {
        self.client < self.server
    }
}

/// Everything the sidecar needs to run, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub scope: ScopeConfig,
    pub method: Method,
    pub timeouts: WatchTimeouts,
}

impl Settings {
    /// Log every setting once.
    pub fn log_summary(&self) {
        let scope = &self.scope;
        match &scope.label_value {
            Some(value) => info!(
                "Looking for resources with LABEL '{}' and LABEL_VALUE '{}'",
                scope.label, value
            ),
            None => info!("Looking for resources with LABEL '{}'", scope.label),
        }
        info!("The default FOLDER to write files to is {}", scope.folder.display());
        info!(
            "FOLDER_ANNOTATION for the destination folder is '{}'",
            scope.folder_annotation
        );
        match &scope.namespace {
            NamespaceScope::All => info!("Looking for resources in the entire cluster"),
            NamespaceScope::Only(names) => {
                info!("Looking for resources ONLY in the {:?} namespaces", names)
            }
        }
        info!("Monitoring {} resources", scope.resource);
        info!("Using the {} METHOD", self.method);
        match scope.default_file_mode {
            Some(mode) => info!("DEFAULT_FILE_MODE is {}", mode),
            None => info!("DEFAULT_FILE_MODE is not set"),
        }
        if scope.unique_filenames {
            info!("Unique filenames will be enforced.");
        }

        info!(
            "Client watching requests using a timeout of {} seconds",
            self.timeouts.client
        );
        info!(
            "Server watching requests using a timeout of {} seconds",
            self.timeouts.server
        );
        if self.timeouts.client_shorter_than_server() {
            warn!(
                "The client timeout ({}) is shorter than the server timeout ({}). Consider increasing the client timeout to be higher",
                self.timeouts.client, self.timeouts.server
            );
        }
    }
}

/// Parse a timeout in seconds, falling back to `default` on anything that is
/// not a non-negative integer.
pub fn timeout_or_default(name: &str, raw: Option<&str>, default: u32) -> u32 {
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse() {
        Ok(seconds) => seconds,
        Err(_) => {
            warn!(
                "Expected an integer value for {} and got {:?}. Using default {} instead",
                name, raw, default
            );
            default
        }
    }
}
