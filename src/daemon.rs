//! Access to the external daemon manager that supervises application services.
use std::process::Command;

use serde_json::Value;
use tracing::debug;

use crate::config::DaemonSettings;
use crate::error::DaemonError;

/// Operations hoststat needs from a daemon manager.
pub trait DaemonManager: Sync {
    /// Raw listing, one service name per line.
    fn list_services(&self) -> Result<String, DaemonError>;

    /// The JSON configuration document of one service.
    fn service_config(&self, name: &str) -> Result<Value, DaemonError>;
}

/// Daemon manager reached by running its command-line tool.
#[derive(Debug, Clone)]
pub struct CommandDaemon {
    command: String,
    list_args: Vec<String>,
    config_args: Vec<String>,
}

impl CommandDaemon {
    /// Builds the adapter from configuration.
    pub fn from_settings(settings: &DaemonSettings) -> Self {
        Self {
            command: settings.command.clone(),
            list_args: settings.list_args.clone(),
            config_args: settings.config_args.clone(),
        }
    }

    fn describe(&self, args: &[&str]) -> String {
        std::iter::once(self.command.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the daemon tool and returns its stdout.
    fn run(&self, args: &[&str]) -> Result<String, DaemonError> {
        debug!("Running daemon command: {}", self.describe(args));
        let output = Command::new(&self.command)
            .args(args)
            .output()
            .map_err(|source| DaemonError::Spawn {
                command: self.describe(args),
                source,
            })?;

        if !output.status.success() {
            return Err(DaemonError::ExitStatus {
                command: self.describe(args),
                code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DaemonManager for CommandDaemon {
    fn list_services(&self) -> Result<String, DaemonError> {
        let args: Vec<&str> = self.list_args.iter().map(String::as_str).collect();
        self.run(&args)
    }

    fn service_config(&self, name: &str) -> Result<Value, DaemonError> {
        let args: Vec<&str> = self
            .config_args
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(name))
            .collect();
        let stdout = self.run(&args)?;
        serde_json::from_str(&stdout).map_err(|source| DaemonError::InvalidJson {
            command: self.describe(&args),
            source,
        })
    }
}

/// Extracts service names from a daemon listing.
///
/// Blank lines are dropped; names in `exclude` are dropped when
/// `exclude_defaults` is set. Listing order is kept.
pub fn service_names(raw: &str, exclude: &[String], exclude_defaults: bool) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| !exclude_defaults || !exclude.iter().any(|ex| ex.as_str() == *name))
        .map(str::to_string)
        .collect()
}

/// Lists the services of `daemon` that belong in the report.
pub fn list_service_names<D: DaemonManager + ?Sized>(
    daemon: &D,
    exclude: &[String],
    exclude_defaults: bool,
) -> Result<Vec<String>, DaemonError> {
    let raw = daemon.list_services()?;
    Ok(service_names(&raw, exclude, exclude_defaults))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_blank_lines_dropped() {
        let names = service_names("a\n\n b \nc\n", &[], true);
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn defaults_are_excluded_only_when_asked() {
        let exclude = vec!["c".to_string()];
        assert_eq!(service_names("a\n\n b \nc\n", &exclude, true), vec!["a", "b"]);
        assert_eq!(
            service_names("a\n\n b \nc\n", &exclude, false),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn missing_command_is_a_spawn_error() {
        let settings = DaemonSettings {
            command: "/nonexistent/hoststat-daemon".into(),
            ..DaemonSettings::default()
        };
        let daemon = CommandDaemon::from_settings(&settings);
        let err = daemon.list_services().unwrap_err();
        assert!(matches!(err, DaemonError::Spawn { .. }));
        assert!(err.to_string().contains("list --filter all"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_exit_status() {
        let settings = DaemonSettings {
            command: "false".into(),
            ..DaemonSettings::default()
        };
        let daemon = CommandDaemon::from_settings(&settings);
        let err = daemon.service_config("svc").unwrap_err();
        assert!(matches!(err, DaemonError::ExitStatus { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[test]
    fn service_config_parses_json_stdout() {
        // `echo` appends the service name, which closes the document.
        let settings = DaemonSettings {
            command: "echo".into(),
            config_args: vec![r#"{"env":{"SERVICE_TMP_DIR":"/tmp/svc"},"name":"#.into()],
            ..DaemonSettings::default()
        };
        let daemon = CommandDaemon::from_settings(&settings);
        let config = daemon.service_config(r#""svc"}"#).unwrap();
        assert_eq!(config["env"]["SERVICE_TMP_DIR"], "/tmp/svc");
    }
}
