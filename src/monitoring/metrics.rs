//! Crawl metrics collection
//!
//! A single counter block guarded by a mutex, plus per-host records, a
//! bounded rolling window of response times, and a bounded snapshot
//! history. Everything the periodic reporter and the final report print
//! comes from here.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::utils::extract_host;

/// Rolling response-time window size.
const RESPONSE_TIME_WINDOW: usize = 100;
/// Bounded snapshot history length.
const HISTORY_LIMIT: usize = 100;

/// Core crawl counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlCounters {
    pub pages_crawled: u64,
    pub pages_per_second: f64,
    pub queue_depth: usize,
    pub success_rate: f64,
    pub avg_response_time: f64,
    pub bytes_downloaded: u64,
    pub errors_count: u64,
    pub duplicates_skipped: u64,
}

/// Per-host crawl record.
#[derive(Debug, Clone, Serialize)]
pub struct HostRecord {
    pub host: String,
    pub pages_crawled: u64,
    pub errors: u64,
    pub success_rate: f64,
    pub avg_response_time: f64,
    pub total_response_time: f64,
    pub last_crawled: Option<DateTime<Utc>>,
}

impl HostRecord {
    fn new(host: String) -> Self {
        Self {
            host,
            pages_crawled: 0,
            errors: 0,
            success_rate: 0.0,
            avg_response_time: 0.0,
            total_response_time: 0.0,
            last_crawled: None,
        }
    }

    fn recompute(&mut self) {
        let attempts = self.pages_crawled + self.errors;
        if attempts > 0 {
            self.success_rate = self.pages_crawled as f64 / attempts as f64 * 100.0;
        }
        if self.pages_crawled > 0 {
            self.avg_response_time = self.total_response_time / self.pages_crawled as f64;
        }
    }
}

/// Point-in-time view of crawl state.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: f64,
    pub counters: CrawlCounters,
    pub hosts: HashMap<String, HostRecord>,
}

struct MetricsState {
    counters: CrawlCounters,
    hosts: HashMap<String, HostRecord>,
    response_times: VecDeque<f64>,
    history: VecDeque<MetricsSnapshot>,
}

/// Thread-safe metrics aggregation for one crawl.
pub struct MetricsCollector {
    started: Instant,
    state: Mutex<MetricsState>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Mutex::new(MetricsState {
                counters: CrawlCounters::default(),
                hosts: HashMap::new(),
                response_times: VecDeque::with_capacity(RESPONSE_TIME_WINDOW),
                history: VecDeque::with_capacity(HISTORY_LIMIT),
            }),
        }
    }

    /// Record a successfully crawled page.
    pub fn record_page_crawled(
        &self,
        url: &str,
        response_time: f64,
        _status: u16,
        content_length: usize,
    ) {
        let mut state = self.state.lock();
        state.counters.pages_crawled += 1;
        state.counters.bytes_downloaded += content_length as u64;

        if state.response_times.len() == RESPONSE_TIME_WINDOW {
            state.response_times.pop_front();
        }
        state.response_times.push_back(response_time);

        let host = extract_host(url);
        let record = state
            .hosts
            .entry(host.clone())
            .or_insert_with(|| HostRecord::new(host));
        record.pages_crawled += 1;
        record.total_response_time += response_time;
        record.last_crawled = Some(Utc::now());
        record.recompute();

        self.recompute_counters(&mut state);
    }

    /// Record a failed URL.
    pub fn record_error(&self, url: &str, _reason: &str, _status: Option<u16>) {
        let mut state = self.state.lock();
        state.counters.errors_count += 1;

        let host = extract_host(url);
        let record = state
            .hosts
            .entry(host.clone())
            .or_insert_with(|| HostRecord::new(host));
        record.errors += 1;
        record.recompute();

        self.recompute_counters(&mut state);
    }

    /// Record a URL skipped as a duplicate (URL or content).
    pub fn record_duplicate_skipped(&self, _url: &str) {
        self.state.lock().counters.duplicates_skipped += 1;
    }

    /// Update the frontier depth gauge.
    pub fn update_queue_depth(&self, depth: usize) {
        self.state.lock().counters.queue_depth = depth;
    }

    /// Current snapshot of all counters and host records.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock();
        MetricsSnapshot {
            timestamp: Utc::now(),
            uptime_seconds: self.started.elapsed().as_secs_f64(),
            counters: state.counters.clone(),
            hosts: state.hosts.clone(),
        }
    }

    /// Append the current snapshot to the bounded history.
    pub fn store_snapshot(&self) {
        let snapshot = self.snapshot();
        let mut state = self.state.lock();
        if state.history.len() == HISTORY_LIMIT {
            state.history.pop_front();
        }
        state.history.push_back(snapshot);
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    #[must_use]
    pub fn uptime_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn recompute_counters(&self, state: &mut MetricsState) {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            state.counters.pages_per_second = state.counters.pages_crawled as f64 / elapsed;
        }

        let attempts = state.counters.pages_crawled + state.counters.errors_count;
        if attempts > 0 {
            state.counters.success_rate =
                state.counters.pages_crawled as f64 / attempts as f64 * 100.0;
        }

        if !state.response_times.is_empty() {
            state.counters.avg_response_time =
                state.response_times.iter().sum::<f64>() / state.response_times.len() as f64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_and_error_counters() {
        let metrics = MetricsCollector::new();
        metrics.record_page_crawled("https://a.test/1", 0.5, 200, 1000);
        metrics.record_page_crawled("https://a.test/2", 1.5, 200, 3000);
        metrics.record_error("https://a.test/3", "HTTP 500", Some(500));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counters.pages_crawled, 2);
        assert_eq!(snapshot.counters.errors_count, 1);
        assert_eq!(snapshot.counters.bytes_downloaded, 4000);
        assert!((snapshot.counters.avg_response_time - 1.0).abs() < 1e-9);
        assert!((snapshot.counters.success_rate - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_host_records_track_per_host() {
        let metrics = MetricsCollector::new();
        metrics.record_page_crawled("https://a.test/1", 1.0, 200, 100);
        metrics.record_page_crawled("https://b.test/1", 3.0, 200, 100);
        metrics.record_error("https://b.test/2", "timeout", None);

        let snapshot = metrics.snapshot();
        let a = &snapshot.hosts["a.test"];
        assert_eq!(a.pages_crawled, 1);
        assert_eq!(a.errors, 0);
        assert_eq!(a.success_rate, 100.0);

        let b = &snapshot.hosts["b.test"];
        assert_eq!(b.pages_crawled, 1);
        assert_eq!(b.errors, 1);
        assert_eq!(b.success_rate, 50.0);
        assert_eq!(b.avg_response_time, 3.0);
    }

    #[test]
    fn test_duplicates_and_queue_depth() {
        let metrics = MetricsCollector::new();
        metrics.record_duplicate_skipped("https://a.test/1");
        metrics.record_duplicate_skipped("https://a.test/2");
        metrics.update_queue_depth(7);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.counters.duplicates_skipped, 2);
        assert_eq!(snapshot.counters.queue_depth, 7);
    }

    #[test]
    fn test_history_is_bounded() {
        let metrics = MetricsCollector::new();
        for _ in 0..150 {
            metrics.store_snapshot();
        }
        assert_eq!(metrics.history_len(), 100);
    }

    #[test]
    fn test_response_time_window_is_bounded() {
        let metrics = MetricsCollector::new();
        for i in 0..200 {
            metrics.record_page_crawled(&format!("https://a.test/{i}"), 1.0, 200, 10);
        }
        // Window holds the last 100 samples, all 1.0
        assert!((metrics.snapshot().counters.avg_response_time - 1.0).abs() < 1e-9);
    }
}
