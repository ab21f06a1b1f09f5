use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{CliError, Result};

/// How chatty the sidecar is when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    #[default]
    Normal,
    /// Debug output from the sidecar's own crates
    Verbose,
    /// Debug output from everything, the Kubernetes client included
    Debug,
}

impl Verbosity {
    pub fn default_directives(&self) -> &'static str {
        match self {
            Self::Normal => "info",
            Self::Verbose => "info,k8s_sidecar=debug,sidecar_core=debug,sidecar_fs=debug",
            Self::Debug => "debug",
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the directives come from `verbosity`.
pub fn init(verbosity: Verbosity) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(verbosity.default_directives()))
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })?;

    Ok(())
}
