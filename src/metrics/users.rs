//! Logged-in user sessions, read from `who`.
use std::process::Command;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MetricsError;

const WHO: &str = "who";

/// One login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedUser {
    pub name: String,
    pub terminal: String,
    pub host: String,
    pub started: String,
}

/// Runs `who` and parses its sessions.
pub fn connected_users() -> Result<Vec<ConnectedUser>, MetricsError> {
    let output = Command::new(WHO)
        .output()
        .map_err(|source| MetricsError::Command {
            command: WHO.into(),
            source,
        })?;

    if !output.status.success() {
        return Err(MetricsError::CommandStatus {
            command: WHO.into(),
            code: output.status.code(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_who(&stdout, Local::now().year()))
}

/// Parses `who` output in either the ISO (`2024-05-02 10:15`) or the POSIX
/// locale (`May  2 10:15`) time format. `year` fills in the latter.
pub fn parse_who(output: &str, year: i32) -> Vec<ConnectedUser> {
    output
        .lines()
        .filter_map(|line| {
            let parsed = parse_who_line(line, year);
            if parsed.is_none() && !line.trim().is_empty() {
                debug!("Skipping unrecognised who line: {line:?}");
            }
            parsed
        })
        .collect()
}

fn parse_who_line(line: &str, year: i32) -> Option<ConnectedUser> {
    let (session, comment) = match line.find('(') {
        Some(open) => (&line[..open], Some(&line[open + 1..])),
        None => (line, None),
    };

    let mut fields = session.split_whitespace();
    let name = fields.next()?.to_string();
    let terminal = fields.next()?.to_string();
    let rest: Vec<&str> = fields.collect();

    let started = match rest.as_slice() {
        [date, time, ..] if date.contains('-') => {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            date.and_time(parse_clock(time)?)
        }
        [month, day, time, ..] => {
            let date =
                NaiveDate::parse_from_str(&format!("{year} {month} {day}"), "%Y %b %d").ok()?;
            date.and_time(parse_clock(time)?)
        }
        _ => return None,
    };

    let host = comment
        .and_then(|c| c.split(')').next())
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    Some(ConnectedUser {
        name,
        terminal,
        host,
        started: format_started(started),
    })
}

fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

fn format_started(started: NaiveDateTime) -> String {
    started.format("%Y-%m-%d %H:%M:%S").to_string()
}
