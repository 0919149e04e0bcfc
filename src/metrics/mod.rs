//! Host metric collection on top of `sysinfo`.
use std::{
    net::{IpAddr, Ipv4Addr},
    thread,
};

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, Networks, System};
use tracing::debug;

use crate::error::MetricsError;
use crate::format::format_uptime;

mod users;

pub use users::{ConnectedUser, connected_users, parse_who};

/// 1, 5 and 15 minute load averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl LoadAverage {
    /// Labelled values in display order.
    pub fn labelled(&self) -> [(&'static str, f64); 3] {
        [("1m", self.one), ("5m", self.five), ("15m", self.fifteen)]
    }

    /// Expresses each value as a percentage of `cpus` logical CPUs.
    pub fn as_percentage(&self, cpus: usize) -> Self {
        if cpus == 0 {
            return *self;
        }
        let cpus = cpus as f64;
        Self {
            one: self.one / cpus * 100.0,
            five: self.five / cpus * 100.0,
            fifteen: self.fifteen / cpus * 100.0,
        }
    }
}

/// Usage of a single logical CPU.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuStat {
    pub name: String,
    pub usage_percent: f32,
    pub frequency_mhz: u64,
}

/// Physical memory usage in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMemoryStat {
    pub total: u64,
    pub available: u64,
    pub percent: f64,
    pub used: u64,
    pub free: u64,
}

/// Swap usage in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapMemoryStat {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

/// Usage of one mounted filesystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStat {
    pub path: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

/// An IPv4 address bound to a network interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddress {
    pub name: String,
    pub address: String,
    pub netmask: String,
    pub family: String,
}

/// Percentage rounded to one decimal place; zero when `whole` is zero.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

/// Dotted netmask for an IPv4 prefix length.
pub fn ipv4_netmask(prefix: u8) -> Ipv4Addr {
    let bits = u32::MAX
        .checked_shl(32u32.saturating_sub(u32::from(prefix)))
        .unwrap_or(0);
    Ipv4Addr::from(bits)
}

/// Reads host metrics. One collector serves one report cycle.
pub struct HostCollector {
    system: System,
}

impl Default for HostCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCollector {
    /// Creates a collector with memory figures loaded.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self { system }
    }

    /// The host's name.
    pub fn hostname(&self) -> Result<String, MetricsError> {
        System::host_name().ok_or(MetricsError::Unavailable("hostname"))
    }

    /// Time since boot, formatted like `up 3 days, 04:05`.
    pub fn uptime(&self) -> String {
        format_uptime(System::uptime())
    }

    /// Number of logical CPUs.
    pub fn cpu_count(&mut self) -> usize {
        if self.system.cpus().is_empty() {
            self.system.refresh_cpu_all();
        }
        self.system.cpus().len()
    }

    /// Load averages, optionally as a percentage of the logical CPU count.
    pub fn load_average(&mut self, percentage: bool) -> LoadAverage {
        let load = System::load_average();
        let load = LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        };

        if percentage {
            let cpus = self.cpu_count();
            load.as_percentage(cpus)
        } else {
            load
        }
    }

    /// Per-CPU usage, sampled over the minimum update interval.
    pub fn cpu_stats(&mut self) -> Result<Vec<CpuStat>, MetricsError> {
        self.system.refresh_cpu_all();
        thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        self.system.refresh_cpu_all();

        let cpus: Vec<CpuStat> = self
            .system
            .cpus()
            .iter()
            .map(|cpu| CpuStat {
                name: cpu.name().to_string(),
                usage_percent: cpu.cpu_usage(),
                frequency_mhz: cpu.frequency(),
            })
            .collect();

        if cpus.is_empty() {
            return Err(MetricsError::Unavailable("cpu list"));
        }
        Ok(cpus)
    }

    /// Physical memory usage.
    pub fn virtual_memory(&self) -> VirtualMemoryStat {
        let total = self.system.total_memory();
        let available = self.system.available_memory();
        VirtualMemoryStat {
            total,
            available,
            percent: percent(total.saturating_sub(available), total),
            used: self.system.used_memory(),
            free: self.system.free_memory(),
        }
    }

    /// Swap usage.
    pub fn swap_memory(&self) -> SwapMemoryStat {
        let total = self.system.total_swap();
        let used = self.system.used_swap();
        SwapMemoryStat {
            total,
            used,
            free: self.system.free_swap(),
            percent: percent(used, total),
        }
    }

    /// Usage of every mounted disk.
    pub fn disks(&self) -> Result<Vec<DiskStat>, MetricsError> {
        let disks = Disks::new_with_refreshed_list();
        let stats: Vec<DiskStat> = disks
            .list()
            .iter()
            .map(|disk| {
                let total = disk.total_space();
                let free = disk.available_space();
                let used = total.saturating_sub(free);
                DiskStat {
                    path: disk.mount_point().to_string_lossy().to_string(),
                    total,
                    used,
                    free,
                    percent: percent(used, total),
                }
            })
            .collect();

        if stats.is_empty() {
            return Err(MetricsError::Unavailable("disk list"));
        }
        Ok(stats)
    }

    /// IPv4 addresses per interface. An unknown `interface` lists all of them.
    pub fn interfaces(&self, interface: Option<&str>) -> Vec<InterfaceAddress> {
        let networks = Networks::new_with_refreshed_list();
        let known =
            interface.filter(|name| networks.iter().any(|(iface, _)| iface.as_str() == *name));
        if let Some(name) = interface
            && known.is_none()
        {
            debug!("Interface '{name}' not found; listing all interfaces");
        }

        let mut addresses: Vec<InterfaceAddress> = networks
            .iter()
            .filter(|(iface, _)| known.is_none_or(|name| iface.as_str() == name))
            .flat_map(|(iface, data)| {
                data.ip_networks().iter().filter_map(move |net| match net.addr {
                    IpAddr::V4(addr) => Some(InterfaceAddress {
                        name: iface.clone(),
                        address: addr.to_string(),
                        netmask: ipv4_netmask(net.prefix).to_string(),
                        family: "ipv4".into(),
                    }),
                    IpAddr::V6(_) => None,
                })
            })
            .collect();

        addresses.sort_by(|a, b| a.name.cmp(&b.name).then(a.address.cmp(&b.address)));
        addresses
    }

    /// Logged-in user sessions.
    pub fn connected_users(&self) -> Result<Vec<ConnectedUser>, MetricsError> {
        connected_users()
    }
}
