//! Error types for the k8s-sidecar binary

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end the process with a non-zero exit code
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration, retry exhaustion, or other engine failure
    #[error(transparent)]
    Core(#[from] sidecar_core::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// No usable kubeconfig or in-cluster configuration
    #[error("Failed to load Kubernetes configuration: {0}")]
    KubeConfig(#[from] kube::config::InferConfigError),

    /// The Kubernetes client could not be built
    #[error("Failed to create Kubernetes client: {0}")]
    Kube(#[from] kube::Error),

    #[error("Failed to initialize logging: {message}")]
    Logging { message: String },
}
