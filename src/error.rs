//! Error handling for hoststat.
use std::path::PathBuf;

use thiserror::Error;

/// Defines the errors that abort a report invocation.
#[derive(Debug, Error)]
pub enum HostStatError {
    /// Error reading or accessing a configuration file.
    #[error("Failed to read config file: {0}")]
    ConfigReadError(#[from] std::io::Error),

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    ConfigParseError(#[from] serde_yaml::Error),

    /// A `${VAR}` reference in the configuration has no value in the environment.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// Services were requested but the daemon integration is turned off.
    #[error("daemon integration is disabled")]
    DaemonDisabled,

    /// Error talking to the daemon manager outside of per-service correlation.
    #[error("Daemon manager error: {0}")]
    Daemon(#[from] DaemonError),
}

/// Error type for invocations of the external daemon manager.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The daemon command could not be spawned.
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        /// The command line that was attempted.
        command: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The daemon command ran but exited unsuccessfully.
    #[error("'{command}' exited with status {code:?}")]
    ExitStatus {
        /// The command line that was run.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
    },

    /// The daemon command printed something that is not a JSON document.
    #[error("Invalid JSON from '{command}': {source}")]
    InvalidJson {
        /// The command line that was run.
        command: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Reason a single service could not be matched to a running process.
///
/// These never abort a report; they are attached to the service record
/// they belong to.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// Fetching the service configuration from the daemon manager failed.
    #[error("service config unavailable: {0}")]
    DaemonCommand(#[from] DaemonError),

    /// The service configuration has no temp directory at the expected location.
    #[error("no temp directory at '{pointer}' in service config")]
    MissingTempDir {
        /// JSON pointer that was looked up.
        pointer: String,
    },

    /// The PID file could not be read.
    #[error("cannot read {path:?}: {source}")]
    PidFileRead {
        /// Path of the PID file.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The PID file does not contain a process id.
    #[error("invalid pid {contents:?} in {path:?}")]
    PidParse {
        /// Path of the PID file.
        path: PathBuf,
        /// Trimmed file contents.
        contents: String,
    },
}

/// Error type for host metric collection.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Error executing a helper command such as `who`.
    #[error("Command '{command}' failed: {source}")]
    Command {
        /// The command that was run.
        command: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// The helper command exited with a non-zero status.
    #[error("Command '{command}' exited with status {code:?}")]
    CommandStatus {
        /// The command that was run.
        command: String,
        /// Exit code, if any.
        code: Option<i32>,
    },

    /// The OS reported no data for a metric.
    #[error("{0} unavailable on this host")]
    Unavailable(&'static str),
}
