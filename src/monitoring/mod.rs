//! Metrics collection, periodic progress reporting, and system sampling.

pub mod metrics;
pub mod reporter;
pub mod system;

pub use metrics::{CrawlCounters, HostRecord, MetricsCollector, MetricsSnapshot};
pub use reporter::{EfficiencyMetrics, FinalReport, PerformanceSummary, ProgressReporter};
pub use system::{SystemMetrics, SystemSampler};
