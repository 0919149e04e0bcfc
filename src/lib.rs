//! Hoststat prints a snapshot of host health as text tables: load, memory,
//! swap, CPU, disks, network interfaces and logged-in users. Numeric values
//! are graded against configurable warning and critical thresholds, and
//! services managed by an external daemon are matched to their running
//! processes.

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Matching daemon services to OS processes.
pub mod correlate;

/// Daemon manager adapter.
pub mod daemon;

/// Error handling.
pub mod error;

/// Value formatting helpers.
pub mod format;

/// Host metric collection.
pub mod metrics;

/// Report assembly and table rendering.
pub mod report;

/// Threshold grading and coloring.
pub mod threshold;
