//! On-demand system resource sampling
//!
//! CPU, process RSS, disk usage, network deltas from a crawl-start baseline,
//! and the open-file count. Sampled when a report is produced rather than on
//! a fixed schedule.

use serde::Serialize;
use sysinfo::{Disks, Networks, System};

/// One sample of system resource usage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_used_mb: f64,
    pub process_memory_mb: f64,
    pub disk_used_gb: f64,
    pub network_sent_mb: f64,
    pub network_recv_mb: f64,
    pub open_files: usize,
}

/// Samples system metrics against a baseline captured at construction.
pub struct SystemSampler {
    system: parking_lot::Mutex<System>,
    baseline_sent: u64,
    baseline_recv: u64,
}

impl SystemSampler {
    #[must_use]
    pub fn new() -> Self {
        let networks = Networks::new_with_refreshed_list();
        let (baseline_sent, baseline_recv) = total_network_bytes(&networks);
        Self {
            system: parking_lot::Mutex::new(System::new_all()),
            baseline_sent,
            baseline_recv,
        }
    }

    /// Take a fresh sample.
    #[must_use]
    pub fn sample(&self) -> SystemMetrics {
        let mut system = self.system.lock();
        system.refresh_all();

        let networks = Networks::new_with_refreshed_list();
        let (sent, recv) = total_network_bytes(&networks);

        let disks = Disks::new_with_refreshed_list();
        let disk_used: u64 = disks
            .iter()
            .map(|d| d.total_space().saturating_sub(d.available_space()))
            .sum();

        let process_memory = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| system.process(pid))
            .map_or(0, sysinfo::Process::memory);

        SystemMetrics {
            cpu_percent: system.global_cpu_usage(),
            memory_used_mb: system.used_memory() as f64 / (1024.0 * 1024.0),
            process_memory_mb: process_memory as f64 / (1024.0 * 1024.0),
            disk_used_gb: disk_used as f64 / (1024.0 * 1024.0 * 1024.0),
            network_sent_mb: sent.saturating_sub(self.baseline_sent) as f64 / (1024.0 * 1024.0),
            network_recv_mb: recv.saturating_sub(self.baseline_recv) as f64 / (1024.0 * 1024.0),
            open_files: open_file_count(),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

fn total_network_bytes(networks: &Networks) -> (u64, u64) {
    networks.iter().fold((0, 0), |(sent, recv), (_, data)| {
        (sent + data.total_transmitted(), recv + data.total_received())
    })
}

#[cfg(target_os = "linux")]
fn open_file_count() -> usize {
    std::fs::read_dir("/proc/self/fd").map_or(0, |entries| entries.count())
}

#[cfg(not(target_os = "linux"))]
fn open_file_count() -> usize {
    0
}
