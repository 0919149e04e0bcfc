//! Threshold policies and severity colorization of scalar metrics.
use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};
use tracing::warn;

const RED: u8 = 31;
const GREEN: u8 = 32;
const YELLOW: u8 = 33;
const RESET: &str = "\x1b[0m";

/// Metric families that carry a threshold policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    /// 1/5/15 minute load averages.
    LoadAverage,
    /// Percent of physical memory in use.
    VirtualMemory,
    /// Percent of swap in use.
    SwapMemory,
    /// Percent of a mounted filesystem in use.
    Disk,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Warning and critical levels for one metric kind.
///
/// `warning <= critical` is expected but not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    pub warning: f64,
    pub critical: f64,
}

impl ThresholdPolicy {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    fn is_ordered(&self) -> bool {
        self.warning <= self.critical
    }
}

/// Policy table for every [`MetricKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub load_average: ThresholdPolicy,
    pub virtual_memory: ThresholdPolicy,
    pub swap_memory: ThresholdPolicy,
    pub disk: ThresholdPolicy,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            load_average: ThresholdPolicy::new(10.0, 14.0),
            virtual_memory: ThresholdPolicy::new(80.0, 90.0),
            swap_memory: ThresholdPolicy::new(5.0, 10.0),
            disk: ThresholdPolicy::new(80.0, 95.0),
        }
    }
}

impl Thresholds {
    /// Returns the policy registered for `kind`.
    pub fn policy(&self, kind: MetricKind) -> ThresholdPolicy {
        match kind {
            MetricKind::LoadAverage => self.load_average,
            MetricKind::VirtualMemory => self.virtual_memory,
            MetricKind::SwapMemory => self.swap_memory,
            MetricKind::Disk => self.disk,
        }
    }

    /// Logs every policy whose warning level exceeds its critical level.
    pub fn warn_unordered(&self) {
        use strum::IntoEnumIterator;

        for kind in MetricKind::iter() {
            let policy = self.policy(kind);
            if !policy.is_ordered() {
                warn!(
                    "Threshold for {kind} has warning {} above critical {}; critical wins on overlap",
                    policy.warning, policy.critical
                );
            }
        }
    }
}

/// Classification of a metric value against a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    fn ansi_code(self) -> u8 {
        match self {
            Severity::Normal => GREEN,
            Severity::Warning => YELLOW,
            Severity::Critical => RED,
        }
    }
}

/// Classifies a numeric value.
///
/// Critical is tested first, so a value equal to `critical` is Critical even
/// though the Warning range is inclusive at its upper end.
pub fn classify(value: f64, policy: ThresholdPolicy) -> Severity {
    if policy.critical <= value {
        Severity::Critical
    } else if policy.warning <= value && value <= policy.critical {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

/// A metric rendered to text together with its severity.
///
/// `severity` is `None` when the value was not numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colorized {
    #[serde(rename = "value")]
    pub text: String,
    pub severity: Option<Severity>,
}

impl Colorized {
    /// Renders the value, wrapped in an ANSI color when `color` is set and a
    /// severity applies.
    pub fn paint(&self, color: bool) -> String {
        match self.severity {
            Some(severity) if color => {
                format!("\x1b[{}m {}{RESET}", severity.ansi_code(), self.text)
            }
            _ => self.text.clone(),
        }
    }
}

impl fmt::Display for Colorized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.paint(true))
    }
}

/// Classifies any printable metric against `policy`.
///
/// Values that do not parse as a number come back unchanged with no severity.
pub fn colorize<T: fmt::Display + ?Sized>(value: &T, policy: ThresholdPolicy) -> Colorized {
    let text = value.to_string();
    match text.trim().parse::<f64>() {
        Ok(number) => Colorized {
            text: format_number(number),
            severity: Some(classify(number, policy)),
        },
        Err(_) => Colorized {
            text,
            severity: None,
        },
    }
}

/// Formats a float the way it is shown in tables: integral values keep one
/// decimal place.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
