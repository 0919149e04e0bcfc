//! Builds a host report from collected metrics and renders it as tables.
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use comfy_table::{
    Table,
    presets::{ASCII_FULL, ASCII_FULL_CONDENSED},
};
use serde::Serialize;
use strum_macros::{AsRefStr, EnumIter, EnumString};
use tracing::{debug, warn};

use crate::config::Config;
use crate::correlate::{Correlator, ServiceRecord, SystemProcessTable};
use crate::daemon::{CommandDaemon, list_service_names};
use crate::error::HostStatError;
use crate::format::{bytes_to_human, pprint_secs};
use crate::metrics::{
    ConnectedUser, CpuStat, DiskStat, HostCollector, InterfaceAddress, SwapMemoryStat,
    VirtualMemoryStat,
};
use crate::threshold::{Colorized, MetricKind, colorize};

/// Report sections in display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Section {
    Common,
    Memory,
    Swap,
    Cpu,
    Disk,
    Interfaces,
    Users,
    Services,
}

impl Section {
    /// Noun used in the fallback row when collection fails.
    fn subject(self) -> &'static str {
        match self {
            Section::Common => "common",
            Section::Memory => "virtual memory",
            Section::Swap => "swap memory",
            Section::Cpu => "cpu",
            Section::Disk => "disk",
            Section::Interfaces => "interface",
            Section::Users => "user",
            Section::Services => "daemon applications",
        }
    }
}

/// What to collect and how to render it.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Sections to include; empty means every section that is enabled.
    pub sections: Vec<Section>,
    /// Wrap graded values in ANSI colors.
    pub color: bool,
    /// Show byte counts as `1.5GB` instead of raw integers.
    pub human_bytes: bool,
    /// Restrict the interfaces section to one interface.
    pub interface: Option<String>,
    /// Include daemon services that are excluded by default.
    pub all_services: bool,
    /// Show load averages as a percentage of the logical CPU count.
    pub load_percent: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
            color: true,
            human_bytes: true,
            interface: None,
            all_services: false,
            load_percent: false,
        }
    }
}

/// A statistic together with the grading of its headline value.
#[derive(Debug, Clone, Serialize)]
pub struct Graded<T> {
    #[serde(flatten)]
    pub stat: T,
    pub level: Colorized,
}

/// One load average window.
#[derive(Debug, Clone, Serialize)]
pub struct LoadWindow {
    pub window: &'static str,
    pub value: f64,
}

/// Hostname, uptime and load averages.
#[derive(Debug, Clone, Serialize)]
pub struct CommonMetrics {
    pub hostname: String,
    pub uptime: String,
    pub load_average: Vec<Graded<LoadWindow>>,
}

/// Collected data of one section.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SectionData {
    Common(CommonMetrics),
    Memory(Graded<VirtualMemoryStat>),
    Swap(Graded<SwapMemoryStat>),
    Cpu(Vec<CpuStat>),
    Disk(Vec<Graded<DiskStat>>),
    Interfaces(Vec<InterfaceAddress>),
    Users(Vec<ConnectedUser>),
    Services(Vec<ServiceRecord>),
}

/// A section's data, or why it could not be collected.
#[derive(Debug, Serialize)]
pub struct SectionReport {
    pub section: Section,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SectionData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything gathered in one report cycle.
#[derive(Debug, Serialize)]
pub struct HostReport {
    pub captured_at: DateTime<Utc>,
    pub sections: Vec<SectionReport>,
}

/// Resolves the sections to collect for a given configuration.
pub fn selected_sections(options: &ReportOptions, config: &Config) -> Vec<Section> {
    use strum::IntoEnumIterator;

    if options.sections.is_empty() {
        return Section::iter()
            .filter(|section| *section != Section::Services || config.daemon.enabled)
            .collect();
    }

    let mut sections: Vec<Section> = Section::iter()
        .filter(|section| options.sections.contains(section))
        .collect();
    sections.dedup();
    sections
}

/// Collects every selected section. Failures are kept per section.
pub fn build_report(config: &Config, options: &ReportOptions) -> HostReport {
    let mut collector = HostCollector::new();
    let sections = selected_sections(options, config)
        .into_iter()
        .map(|section| {
            debug!("Collecting {} section", section.as_ref());
            match collect_section(section, &mut collector, config, options) {
                Ok(data) => SectionReport {
                    section,
                    data: Some(data),
                    error: None,
                },
                Err(err) => {
                    warn!("Unable to collect {} metrics: {err}", section.subject());
                    SectionReport {
                        section,
                        data: None,
                        error: Some(err),
                    }
                }
            }
        })
        .collect();

    HostReport {
        captured_at: Utc::now(),
        sections,
    }
}

fn collect_section(
    section: Section,
    collector: &mut HostCollector,
    config: &Config,
    options: &ReportOptions,
) -> Result<SectionData, String> {
    let thresholds = &config.thresholds;
    let data = match section {
        Section::Common => {
            let policy = thresholds.policy(MetricKind::LoadAverage);
            let load_average = collector
                .load_average(options.load_percent)
                .labelled()
                .into_iter()
                .map(|(window, value)| Graded {
                    stat: LoadWindow { window, value },
                    level: colorize(&value, policy),
                })
                .collect();

            SectionData::Common(CommonMetrics {
                hostname: collector.hostname().map_err(|e| e.to_string())?,
                uptime: collector.uptime(),
                load_average,
            })
        }
        Section::Memory => {
            let stat = collector.virtual_memory();
            let level = colorize(&stat.percent, thresholds.policy(MetricKind::VirtualMemory));
            SectionData::Memory(Graded { stat, level })
        }
        Section::Swap => {
            let stat = collector.swap_memory();
            let level = colorize(&stat.percent, thresholds.policy(MetricKind::SwapMemory));
            SectionData::Swap(Graded { stat, level })
        }
        Section::Cpu => SectionData::Cpu(collector.cpu_stats().map_err(|e| e.to_string())?),
        Section::Disk => {
            let policy = thresholds.policy(MetricKind::Disk);
            let disks = collector.disks().map_err(|e| e.to_string())?;
            SectionData::Disk(
                disks
                    .into_iter()
                    .map(|stat| {
                        let level = colorize(&stat.percent, policy);
                        Graded { stat, level }
                    })
                    .collect(),
            )
        }
        Section::Interfaces => {
            SectionData::Interfaces(collector.interfaces(options.interface.as_deref()))
        }
        Section::Users => {
            SectionData::Users(collector.connected_users().map_err(|e| e.to_string())?)
        }
        Section::Services => {
            SectionData::Services(collect_services(config, options).map_err(|e| e.to_string())?)
        }
    };

    Ok(data)
}

/// Lists the daemon's services and correlates them with running processes.
pub fn collect_services(
    config: &Config,
    options: &ReportOptions,
) -> Result<Vec<ServiceRecord>, HostStatError> {
    let settings = &config.daemon;
    if !settings.enabled {
        return Err(HostStatError::DaemonDisabled);
    }

    let daemon = CommandDaemon::from_settings(settings);
    let names = list_service_names(&daemon, &settings.exclude, !options.all_services)?;
    debug!("Correlating {} daemon services", names.len());

    let processes = SystemProcessTable::snapshot();
    Ok(Correlator::new(&daemon, &processes, settings).correlate(&names))
}

/// Renders sections as text tables.
pub struct Renderer {
    color: bool,
    human_bytes: bool,
}

impl Renderer {
    pub fn new(options: &ReportOptions) -> Self {
        Self {
            color: options.color,
            human_bytes: options.human_bytes,
        }
    }

    /// Renders every section of `report`, each preceded by its title.
    pub fn render(&self, report: &HostReport) -> String {
        let mut out = String::new();
        for section in &report.sections {
            let (title, table) = self.render_section(section);
            let _ = writeln!(out, "{title}");
            let _ = writeln!(out, "{table}");
            out.push('\n');
        }
        out
    }

    fn bytes(&self, value: u64) -> String {
        if self.human_bytes {
            bytes_to_human(value)
        } else {
            value.to_string()
        }
    }

    fn render_section(&self, report: &SectionReport) -> (String, Table) {
        let title = match (report.section, &report.data) {
            (Section::Common, _) => "Common metrics".to_string(),
            (Section::Memory, _) => "Virtual Memory".to_string(),
            (Section::Swap, _) => "Swap Memory".to_string(),
            (Section::Cpu, Some(SectionData::Cpu(cpus))) => format!("CPU's {}", cpus.len()),
            (Section::Cpu, _) => "CPU's".to_string(),
            (Section::Disk, _) => "Disk".to_string(),
            (Section::Interfaces, _) => "Interfaces".to_string(),
            (Section::Users, _) => "Connected Users".to_string(),
            (Section::Services, _) => "Application Statistic".to_string(),
        };

        let table = match &report.data {
            Some(data) => self.data_table(data),
            None => fallback_table(report.section),
        };

        (title, table)
    }

    fn data_table(&self, data: &SectionData) -> Table {
        match data {
            SectionData::Common(common) => {
                let load = common
                    .load_average
                    .iter()
                    .map(|graded| format!("{}: {}", graded.stat.window, graded.level.paint(self.color)))
                    .collect::<Vec<_>>()
                    .join("\n");
                condensed(
                    &["Hostname", "Uptime", "Load Average"],
                    vec![vec![common.hostname.clone(), common.uptime.clone(), load]],
                )
            }
            SectionData::Memory(graded) => {
                let stat = &graded.stat;
                condensed(
                    &["total", "available", "percent", "used", "free"],
                    vec![vec![
                        self.bytes(stat.total),
                        self.bytes(stat.available),
                        graded.level.paint(self.color),
                        self.bytes(stat.used),
                        self.bytes(stat.free),
                    ]],
                )
            }
            SectionData::Swap(graded) => {
                let stat = &graded.stat;
                condensed(
                    &["total", "used", "free", "percent"],
                    vec![vec![
                        self.bytes(stat.total),
                        self.bytes(stat.used),
                        self.bytes(stat.free),
                        graded.level.paint(self.color),
                    ]],
                )
            }
            SectionData::Cpu(cpus) => condensed(
                &["name", "usage %", "frequency MHz"],
                cpus.iter()
                    .map(|cpu| {
                        vec![
                            cpu.name.clone(),
                            format!("{:.1}", cpu.usage_percent),
                            cpu.frequency_mhz.to_string(),
                        ]
                    })
                    .collect(),
            ),
            SectionData::Disk(disks) => bordered(
                &["path", "total", "used", "free", "percent"],
                disks
                    .iter()
                    .map(|graded| {
                        let stat = &graded.stat;
                        vec![
                            stat.path.clone(),
                            self.bytes(stat.total),
                            self.bytes(stat.used),
                            self.bytes(stat.free),
                            graded.level.paint(self.color),
                        ]
                    })
                    .collect(),
            ),
            SectionData::Interfaces(addresses) => condensed(
                &["name", "address", "netmask", "family"],
                addresses
                    .iter()
                    .map(|addr| {
                        vec![
                            addr.name.clone(),
                            addr.address.clone(),
                            addr.netmask.clone(),
                            addr.family.clone(),
                        ]
                    })
                    .collect(),
            ),
            SectionData::Users(users) => condensed(
                &["name", "terminal", "host", "started"],
                users
                    .iter()
                    .map(|user| {
                        vec![
                            user.name.clone(),
                            user.terminal.clone(),
                            user.host.clone(),
                            user.started.clone(),
                        ]
                    })
                    .collect(),
            ),
            SectionData::Services(records) => services_table(records),
        }
    }
}

/// Header row for the services table: fixed columns plus the stat keys of the
/// first running service that has any.
pub fn service_headers(records: &[ServiceRecord]) -> Vec<String> {
    let mut headers: Vec<String> = ["Pid", "Name", "Status", "Started"]
        .iter()
        .map(|h| h.to_string())
        .collect();

    if let Some(record) = records
        .iter()
        .find(|record| record.is_running() && !record.process_stats.is_empty())
    {
        headers.extend(record.process_stats.keys().cloned());
    }

    headers
}

/// Table cells for one service, aligned to `headers`.
pub fn service_row(record: &ServiceRecord, headers: &[String]) -> Vec<String> {
    let mut row = match (&record.process, &record.failure) {
        (Some(process), _) => vec![
            process.pid.to_string(),
            record.name.clone(),
            process.status.clone(),
            i64::try_from(process.started_at)
                .map(pprint_secs)
                .unwrap_or_else(|_| process.started_at.to_string()),
        ],
        (None, Some(err)) => vec![
            "-".into(),
            record.name.clone(),
            format!("unresolved: {err}"),
            "-".into(),
        ],
        (None, None) => vec![
            "-".into(),
            record.name.clone(),
            "not running".into(),
            "-".into(),
        ],
    };

    for key in headers.iter().skip(row.len()) {
        row.push(record.process_stats.get(key).cloned().unwrap_or_default());
    }

    row
}

fn services_table(records: &[ServiceRecord]) -> Table {
    let headers = service_headers(records);
    let rows = records
        .iter()
        .map(|record| service_row(record, &headers))
        .collect();
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    bordered(&header_refs, rows)
}

fn fallback_table(section: Section) -> Table {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL_CONDENSED);
    table.add_row(vec![format!("Unable to collect {} metrics", section.subject())]);
    table
}

fn condensed(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    build_table(ASCII_FULL_CONDENSED, headers, rows)
}

fn bordered(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    build_table(ASCII_FULL, headers, rows)
}

fn build_table(preset: &str, headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    table.load_preset(preset);
    table.set_header(headers.to_vec());
    for row in rows {
        table.add_row(row);
    }
    table
}
