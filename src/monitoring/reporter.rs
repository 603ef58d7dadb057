//! Periodic progress reporting and the final crawl report
//!
//! A spawned task prints a human-readable progress report every
//! `report_interval` and appends a snapshot to the bounded metrics history.
//! On crawl exit the final report adds a performance summary, a per-host
//! summary, efficiency ratios, and a system-resource sample.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::metrics::{HostRecord, MetricsCollector, MetricsSnapshot};
use super::system::{SystemMetrics, SystemSampler};

/// Runtime totals for the final report.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub total_runtime_minutes: f64,
    pub pages_per_minute: f64,
    pub efficiency_score: f64,
    pub data_throughput_mbps: f64,
}

/// Derived efficiency ratios.
#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyMetrics {
    pub duplication_rate: f64,
    pub error_rate: f64,
    pub average_page_size_kb: f64,
}

/// Everything the crawl knows about itself at exit.
#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    pub final_snapshot: MetricsSnapshot,
    pub system_metrics: SystemMetrics,
    pub performance_summary: PerformanceSummary,
    pub domain_summary: Vec<HostRecord>,
    pub efficiency_metrics: EfficiencyMetrics,
}

/// Periodic progress reporter over a shared metrics collector.
pub struct ProgressReporter {
    metrics: Arc<MetricsCollector>,
    sampler: Arc<SystemSampler>,
    report_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(metrics: Arc<MetricsCollector>, report_interval: Duration) -> Self {
        Self {
            metrics,
            sampler: Arc::new(SystemSampler::new()),
            report_interval,
            task: Mutex::new(None),
        }
    }

    /// Spawn the periodic reporting task.
    pub fn start(&self) {
        let metrics = Arc::clone(&self.metrics);
        let sampler = Arc::clone(&self.sampler);
        let interval = self.report_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so the first report
            // carries a full interval of data
            ticker.tick().await;
            loop {
                ticker.tick().await;
                print_progress_report(&metrics, &sampler);
                metrics.store_snapshot();
            }
        });

        *self.task.lock() = Some(handle);
    }

    /// Stop the reporting task.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    /// Print one report immediately.
    pub fn print_now(&self) {
        print_progress_report(&self.metrics, &self.sampler);
    }

    /// Build the final report.
    #[must_use]
    pub fn final_report(&self) -> FinalReport {
        let snapshot = self.metrics.snapshot();
        let counters = &snapshot.counters;
        let elapsed = snapshot.uptime_seconds.max(f64::EPSILON);

        let performance_summary = PerformanceSummary {
            total_runtime_minutes: elapsed / 60.0,
            pages_per_minute: counters.pages_crawled as f64 / elapsed * 60.0,
            efficiency_score: counters.success_rate,
            data_throughput_mbps: counters.bytes_downloaded as f64 / elapsed / (1024.0 * 1024.0),
        };

        let total_processed = counters.pages_crawled + counters.duplicates_skipped;
        let attempts = counters.pages_crawled + counters.errors_count;
        let efficiency_metrics = EfficiencyMetrics {
            duplication_rate: if total_processed > 0 {
                counters.duplicates_skipped as f64 / total_processed as f64 * 100.0
            } else {
                0.0
            },
            error_rate: if attempts > 0 {
                counters.errors_count as f64 / attempts as f64 * 100.0
            } else {
                0.0
            },
            average_page_size_kb: if counters.pages_crawled > 0 {
                counters.bytes_downloaded as f64 / counters.pages_crawled as f64 / 1024.0
            } else {
                0.0
            },
        };

        let mut domain_summary: Vec<HostRecord> = snapshot.hosts.values().cloned().collect();
        domain_summary.sort_by(|a, b| b.pages_crawled.cmp(&a.pages_crawled));

        FinalReport {
            system_metrics: self.sampler.sample(),
            performance_summary,
            domain_summary,
            efficiency_metrics,
            final_snapshot: snapshot,
        }
    }
}

fn print_progress_report(metrics: &MetricsCollector, sampler: &SystemSampler) {
    let snapshot = metrics.snapshot();
    let counters = &snapshot.counters;
    let system = sampler.sample();

    info!("==================== CRAWL PROGRESS ====================");
    info!(
        "Pages: {} ({:.2}/s) | queue depth: {} | success rate: {:.1}%",
        counters.pages_crawled,
        counters.pages_per_second,
        counters.queue_depth,
        counters.success_rate
    );
    info!(
        "Avg response: {:.2}s | duplicates skipped: {} | errors: {}",
        counters.avg_response_time, counters.duplicates_skipped, counters.errors_count
    );
    info!(
        "Downloaded: {:.2} MB | net sent/recv: {:.2}/{:.2} MB",
        counters.bytes_downloaded as f64 / (1024.0 * 1024.0),
        system.network_sent_mb,
        system.network_recv_mb
    );
    info!(
        "CPU: {:.1}% | RSS: {:.0} MB | open files: {}",
        system.cpu_percent, system.process_memory_mb, system.open_files
    );

    if !snapshot.hosts.is_empty() {
        let hosts: HashMap<&String, &HostRecord> = snapshot.hosts.iter().collect();
        for (host, record) in hosts {
            info!(
                "  {host}: {} pages, {:.1}% success, {:.2}s avg",
                record.pages_crawled, record.success_rate, record.avg_response_time
            );
        }
    }
    info!("========================================================");
}
