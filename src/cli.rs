//! Command-line interface for hoststat.
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::report::Section;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };

            return Ok(LogLevelArg(level));
        }

        let level = match trimmed.to_ascii_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" | "err" => LevelFilter::ERROR,
            "warn" | "warning" => LevelFilter::WARN,
            "info" | "information" => LevelFilter::INFO,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => return Err(format!("invalid log level '{trimmed}'")),
        };

        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for hoststat.
#[derive(Parser)]
#[command(name = "hstat", version, author)]
#[command(about = "Host status tables with threshold coloring", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Path to the configuration file (defaults to `hoststat.yaml` when present).
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<String>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for hstat.
#[derive(Subcommand)]
pub enum Commands {
    /// Print host metric tables.
    Report {
        /// Only show the given section; repeat for several.
        #[arg(long = "section", value_name = "SECTION")]
        sections: Vec<Section>,

        /// Emit machine-readable JSON output instead of tables.
        #[arg(long)]
        json: bool,

        /// Disable ANSI colors in output.
        #[arg(long = "no-color")]
        no_color: bool,

        /// Print byte counts as integers.
        #[arg(long = "raw-bytes")]
        raw_bytes: bool,

        /// Only list addresses of this network interface.
        #[arg(long, value_name = "NAME")]
        interface: Option<String>,

        /// Include daemon services excluded by configuration.
        #[arg(long = "all-services")]
        all_services: bool,

        /// Show load averages as a percentage of the logical CPU count.
        #[arg(long = "load-percent")]
        load_percent: bool,

        /// Continuously refresh output at the provided interval (e.g., "5", "1s", "2m").
        #[arg(long, value_name = "DURATION")]
        stream: Option<String>,
    },

    /// Show daemon services matched to their running processes.
    Services {
        /// Emit machine-readable JSON output instead of a table.
        #[arg(long)]
        json: bool,

        /// Disable ANSI colors in output.
        #[arg(long = "no-color")]
        no_color: bool,

        /// Include daemon services excluded by configuration.
        #[arg(long = "all-services")]
        all_services: bool,
    },

    /// Print the effective configuration as YAML.
    Config,
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
