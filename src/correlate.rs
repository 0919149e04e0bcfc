//! Matches daemon-managed services to live OS processes through their PID files.
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    thread,
};

use serde::{Serialize, Serializer};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::debug;

use crate::config::DaemonSettings;
use crate::daemon::DaemonManager;
use crate::error::CorrelationError;

/// Command-line markers of JVM heap sizing and the stat key each one fills.
const MEMORY_MARKERS: [(&str, &str); 2] = [("xms", "Xms"), ("xmx", "Xmx")];

/// Snapshot of a live process taken from the OS process table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessHandle {
    pub pid: u32,
    pub name: String,
    pub status: String,
    /// Start time in seconds since the unix epoch.
    pub started_at: u64,
    pub cmdline: Vec<String>,
}

/// Read access to the OS process table.
pub trait ProcessTable: Sync {
    /// Returns the process with `pid`, if it currently exists.
    fn lookup(&self, pid: u32) -> Option<ProcessHandle>;
}

/// Process table backed by a `sysinfo` snapshot taken at construction.
pub struct SystemProcessTable {
    system: System,
}

impl SystemProcessTable {
    /// Captures every process currently visible to this user.
    pub fn snapshot() -> Self {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::everything(),
        );
        Self { system }
    }
}

impl ProcessTable for SystemProcessTable {
    fn lookup(&self, pid: u32) -> Option<ProcessHandle> {
        let process = self.system.process(Pid::from_u32(pid))?;
        Some(ProcessHandle {
            pid,
            name: process.name().to_string_lossy().into_owned(),
            status: process.status().to_string(),
            started_at: process.start_time(),
            cmdline: process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        })
    }
}

/// One daemon service and whatever could be learned about its process.
#[derive(Debug, Serialize)]
pub struct ServiceRecord {
    pub name: String,
    pub process: Option<ProcessHandle>,
    pub process_stats: BTreeMap<String, String>,
    /// Why the service could not be matched to a PID, if it could not.
    #[serde(
        serialize_with = "serialize_failure",
        skip_serializing_if = "Option::is_none"
    )]
    pub failure: Option<CorrelationError>,
}

fn serialize_failure<S: Serializer>(
    failure: &Option<CorrelationError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match failure {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ServiceRecord {
    /// A record with nothing attached yet.
    pub fn unresolved(name: &str) -> Self {
        Self {
            name: name.to_string(),
            process: None,
            process_stats: BTreeMap::new(),
            failure: None,
        }
    }

    /// Whether a live process was attached.
    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }
}

/// Extracts JVM heap flags (`-Xms512m`, `-Xmx1g`) from an argument vector.
///
/// Arguments are split on whitespace and the first token containing each
/// marker supplies the rest of that token as the value. A missing marker or an
/// empty value leaves the key out.
pub fn memory_flags<S: AsRef<str>>(args: &[S]) -> BTreeMap<String, String> {
    let tokens: Vec<&str> = args
        .iter()
        .flat_map(|arg| arg.as_ref().split_whitespace())
        .collect();

    let mut stats = BTreeMap::new();
    for (key, marker) in MEMORY_MARKERS {
        let value = tokens.iter().find_map(|token| {
            token
                .find(marker)
                .map(|offset| &token[offset + marker.len()..])
        });

        if let Some(value) = value.filter(|value| !value.is_empty()) {
            stats.insert(key.to_string(), value.to_string());
        }
    }

    stats
}

/// Derives the per-process stats shown next to a running service.
pub fn process_stats(process: &ProcessHandle) -> BTreeMap<String, String> {
    memory_flags(&process.cmdline)
}

/// Correlates service names with processes via `<temp dir>/<pid file>`.
pub struct Correlator<'a, D: ?Sized, P: ?Sized> {
    daemon: &'a D,
    processes: &'a P,
    tmp_dir_pointer: String,
    pid_file_name: String,
    workers: usize,
}

impl<'a, D, P> Correlator<'a, D, P>
where
    D: DaemonManager + ?Sized,
    P: ProcessTable + ?Sized,
{
    /// Creates a correlator using the PID file layout from `settings`.
    pub fn new(daemon: &'a D, processes: &'a P, settings: &DaemonSettings) -> Self {
        Self {
            daemon,
            processes,
            tmp_dir_pointer: settings.tmp_dir_pointer.clone(),
            pid_file_name: settings.pid_file_name.clone(),
            workers: settings.workers,
        }
    }

    /// Overrides the number of worker threads; `1` correlates serially.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Returns one record per name, in input order.
    ///
    /// A failure for one service is kept on its record and never affects the
    /// others.
    pub fn correlate(&self, names: &[String]) -> Vec<ServiceRecord> {
        let workers = self.workers.clamp(1, names.len().max(1));
        if workers == 1 {
            return names.iter().map(|name| self.correlate_one(name)).collect();
        }

        let mut slots: Vec<Option<ServiceRecord>> = names.iter().map(|_| None).collect();
        let chunk_size = names.len().div_ceil(workers);

        thread::scope(|scope| {
            for (names, slots) in names.chunks(chunk_size).zip(slots.chunks_mut(chunk_size)) {
                scope.spawn(move || {
                    for (name, slot) in names.iter().zip(slots.iter_mut()) {
                        *slot = Some(self.correlate_one(name));
                    }
                });
            }
        });

        slots.into_iter().flatten().collect()
    }

    /// Correlates a single service.
    pub fn correlate_one(&self, name: &str) -> ServiceRecord {
        let mut record = ServiceRecord::unresolved(name);

        let pid = match self.resolve_pid(name) {
            Ok(pid) => pid,
            Err(err) => {
                debug!("Skipping correlation for '{name}': {err}");
                record.failure = Some(err);
                return record;
            }
        };

        match self.processes.lookup(pid) {
            Some(process) => {
                record.process_stats = process_stats(&process);
                record.process = Some(process);
            }
            None => debug!("Service '{name}' has pid {pid} but no such process exists"),
        }

        record
    }

    /// Follows service config → temp directory → PID file → pid.
    fn resolve_pid(&self, name: &str) -> Result<u32, CorrelationError> {
        let config = self.daemon.service_config(name)?;
        let tmp_dir = config
            .pointer(&self.tmp_dir_pointer)
            .and_then(|value| value.as_str())
            .filter(|dir| !dir.is_empty())
            .ok_or_else(|| CorrelationError::MissingTempDir {
                pointer: self.tmp_dir_pointer.clone(),
            })?;

        read_pid_file(&Path::new(tmp_dir).join(&self.pid_file_name))
    }
}

/// Reads a PID file holding a single integer, surrounding whitespace allowed.
pub fn read_pid_file(path: &Path) -> Result<u32, CorrelationError> {
    let contents = fs::read_to_string(path).map_err(|source| CorrelationError::PidFileRead {
        path: PathBuf::from(path),
        source,
    })?;

    let trimmed = contents.trim();
    trimmed.parse::<u32>().map_err(|_| CorrelationError::PidParse {
        path: PathBuf::from(path),
        contents: trimmed.to_string(),
    })
}
