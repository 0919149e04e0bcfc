//! Configuration management for hoststat.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{env, fs, io::ErrorKind, path::Path, sync::LazyLock};
use tracing::debug;

use crate::error::HostStatError;
use crate::threshold::Thresholds;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "hoststat.yaml";

/// Represents the structure of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Warning/critical levels per metric kind.
    pub thresholds: Thresholds,
    /// Daemon manager integration.
    pub daemon: DaemonSettings,
}

/// How to reach the external daemon manager and locate its services' PID files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSettings {
    /// Whether the services section is collected at all.
    pub enabled: bool,
    /// Executable of the daemon manager.
    pub command: String,
    /// Arguments that make the daemon print one service name per line.
    pub list_args: Vec<String>,
    /// Arguments preceding the service name to fetch its JSON config.
    pub config_args: Vec<String>,
    /// JSON pointer to the service temp directory inside the service config.
    pub tmp_dir_pointer: String,
    /// File inside the temp directory holding the service PID.
    pub pid_file_name: String,
    /// Built-in services hidden from the report unless all services are requested.
    pub exclude: Vec<String>,
    /// Worker threads used to correlate services with processes.
    pub workers: usize,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "protei-daemon".into(),
            list_args: vec!["list".into(), "--filter".into(), "all".into()],
            config_args: vec!["get_service_config".into()],
            tmp_dir_pointer: "/env/SERVICE_TMP_DIR".into(),
            pid_file_name: "application.pid".into(),
            exclude: Vec::new(),
            workers: 4,
        }
    }
}

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").expect("valid env var pattern")
});

/// Expands `$VAR` and `${VAR}` references within a string.
fn expand_env_vars(input: &str) -> Result<String, HostStatError> {
    let mut missing = None;
    let result = ENV_VAR_RE.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var_name) => Err(HostStatError::MissingEnvVar(var_name)),
        None => Ok(result.into_owned()),
    }
}

/// Parses configuration text, expanding environment variables first.
pub fn parse_config(content: &str) -> Result<Config, HostStatError> {
    let expanded = expand_env_vars(content)?;
    if expanded.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config =
        serde_yaml::from_str(&expanded).map_err(HostStatError::ConfigParseError)?;
    config.thresholds.warn_unordered();
    Ok(config)
}

/// Loads and parses the configuration file.
///
/// A missing file at the default location yields the default configuration; a
/// missing file that was asked for explicitly is an error.
pub fn load_config(config_path: Option<&str>) -> Result<Config, HostStatError> {
    let explicit = config_path.is_some();
    let config_path = Path::new(config_path.unwrap_or(DEFAULT_CONFIG_PATH));

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound && !explicit => {
            debug!("No config at {}; using defaults", config_path.display());
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(HostStatError::ConfigReadError(std::io::Error::new(
                e.kind(),
                format!("{} ({})", e, config_path.display()),
            )));
        }
    };

    debug!("Loaded config from {}", config_path.display());
    parse_config(&content)
}

/// Renders a configuration back to YAML.
pub fn to_yaml(config: &Config) -> Result<String, HostStatError> {
    serde_yaml::to_string(config).map_err(HostStatError::ConfigParseError)
}
