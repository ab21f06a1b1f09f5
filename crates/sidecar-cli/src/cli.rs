//! CLI argument parsing using clap derive
//!
//! Every setting is a flag backed by an environment variable, so the sidecar
//! can be configured from a pod spec without a command line.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use sidecar_core::{DEFAULT_FOLDER_ANNOTATION, ScopeConfig};

use crate::error::Result;
use crate::logging::Verbosity;
use crate::settings::{
    DEFAULT_WATCH_CLIENT_TIMEOUT, DEFAULT_WATCH_SERVER_TIMEOUT, Settings, WatchTimeouts,
    timeout_or_default,
};

/// Mirror labelled ConfigMaps and Secrets into a local directory
#[derive(Parser, Debug)]
#[command(name = "k8s-sidecar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Label key a resource must carry to be mirrored
    #[arg(long, env = "LABEL")]
    pub label: Option<String>,

    /// Exact value required under the label
    #[arg(long, env = "LABEL_VALUE")]
    pub label_value: Option<String>,

    /// Default directory files are written to
    #[arg(long, env = "FOLDER")]
    pub folder: Option<PathBuf>,

    /// Annotation whose value overrides the folder for a single resource
    #[arg(long, env = "FOLDER_ANNOTATION", default_value = DEFAULT_FOLDER_ANNOTATION)]
    pub folder_annotation: String,

    /// Resource kinds to mirror: configmap, secret or both
    #[arg(long, env = "RESOURCE", default_value = "configmap")]
    pub resource: String,

    /// Name files {namespace}.{kind}_{name}.{key}
    #[arg(long, env = "UNIQUE_FILENAMES", action = ArgAction::Set, value_parser = only_true, num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    pub unique_filenames: bool,

    /// Octal permission bits applied to written files
    #[arg(long, env = "DEFAULT_FILE_MODE")]
    pub default_file_mode: Option<String>,

    /// ALL, or a comma-separated list of namespaces
    #[arg(long, env = "NAMESPACE", default_value = "ALL")]
    pub namespace: String,

    /// WATCH for continuous mirroring, LIST for a single pass
    #[arg(long, env = "METHOD", default_value = "WATCH")]
    pub method: String,

    /// Seconds the API server keeps a watch request open
    #[arg(long, env = "WATCH_SERVER_TIMEOUT")]
    pub watch_server_timeout: Option<String>,

    /// Seconds the client waits on a watch request
    #[arg(long, env = "WATCH_CLIENT_TIMEOUT")]
    pub watch_client_timeout: Option<String>,

    /// Debug output from the sidecar
    #[arg(short, long, env = "VERBOSE", action = ArgAction::Set, value_parser = only_true, num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    pub verbose: bool,

    /// Debug output from everything, the Kubernetes client included
    #[arg(long, env = "DEBUG", action = ArgAction::Set, value_parser = only_true, num_args = 0..=1, default_value = "false", default_missing_value = "true")]
    pub debug: bool,
}

/// Boolean switches are on only for the literal `true`.
fn only_true(value: &str) -> std::result::Result<bool, String> {
    Ok(value == "true")
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.debug {
            Verbosity::Debug
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Validate the raw arguments into [`Settings`].
    ///
    /// # Errors
    ///
    /// Fails when `LABEL` or `FOLDER` is missing, or when `RESOURCE`,
    /// `METHOD`, `NAMESPACE` or `DEFAULT_FILE_MODE` cannot be parsed.
    /// Unparseable timeouts fall back to their defaults with a warning.
    pub fn into_settings(self) -> Result<Settings> {
        let mut scope = ScopeConfig::new(
            self.label.unwrap_or_default(),
            self.folder.unwrap_or_default(),
        )?
        .with_folder_annotation(self.folder_annotation)
        .with_resource(self.resource.parse()?)
        .with_unique_filenames(self.unique_filenames)
        .with_namespace(self.namespace.parse()?);

        if let Some(value) = self.label_value.filter(|v| !v.is_empty()) {
            scope = scope.with_label_value(value);
        }
        if let Some(mode) = self.default_file_mode.filter(|m| !m.trim().is_empty()) {
            scope = scope.with_default_file_mode(mode.parse()?);
        }

        let timeouts = WatchTimeouts {
            server: timeout_or_default(
                "WATCH_SERVER_TIMEOUT",
                self.watch_server_timeout.as_deref(),
                DEFAULT_WATCH_SERVER_TIMEOUT,
            ),
            client: timeout_or_default(
                "WATCH_CLIENT_TIMEOUT",
                self.watch_client_timeout.as_deref(),
                DEFAULT_WATCH_CLIENT_TIMEOUT,
            ),
        };

        Ok(Settings {
            scope,
            method: self.method.parse()?,
            timeouts,
        })
    }
}
