//! Per-host adaptive rate limiting
//!
//! Each host gets a crawl delay, a concurrency ceiling, and a rolling window
//! of recent request samples. A host lock guards the dispatch bookkeeping:
//! `wait` suspends until the host is below its concurrency ceiling and the
//! crawl delay has elapsed since the last dispatch, then atomically records
//! the new dispatch. `request_completed` feeds the response signal back into
//! the delay:
//!
//! - HTTP 429 doubles the delay
//! - HTTP 5xx multiplies it by 1.5
//! - responses slower than 10s multiply it by 1.2
//! - fast successful responses decay it by 0.95, floored at the default

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::{debug, info};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::utils::extract_host;

/// How many samples the per-host window keeps.
const HISTORY_WINDOW: usize = 10;

/// Window for the "recent requests" statistics, in seconds.
const RECENT_WINDOW_SECS: u64 = 300;

/// One completed request.
#[derive(Debug, Clone, Copy)]
struct RequestSample {
    at: Instant,
    response_time: f64,
    status: u16,
}

struct HostState {
    crawl_delay: f64,
    max_concurrent: usize,
    last_request: Option<Instant>,
    active_requests: usize,
    history: VecDeque<RequestSample>,
}

impl HostState {
    fn new(crawl_delay: f64, max_concurrent: usize) -> Self {
        Self {
            crawl_delay,
            max_concurrent,
            last_request: None,
            active_requests: 0,
            history: VecDeque::with_capacity(HISTORY_WINDOW),
        }
    }

    fn push_sample(&mut self, sample: RequestSample) {
        if self.history.len() == HISTORY_WINDOW {
            self.history.pop_front();
        }
        self.history.push_back(sample);
    }
}

/// Per-host statistics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HostRateStats {
    pub host: String,
    pub crawl_delay: f64,
    pub max_concurrent: usize,
    pub active_requests: usize,
    pub recent_requests: usize,
    pub avg_response_time: f64,
}

/// Per-host politeness scheduler.
pub struct RateLimiter {
    default_delay: f64,
    max_concurrent_per_host: usize,
    hosts: DashMap<String, Arc<Mutex<HostState>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(default_delay: f64, max_concurrent_per_host: usize) -> Self {
        Self {
            default_delay,
            max_concurrent_per_host: max_concurrent_per_host.max(1),
            hosts: DashMap::new(),
        }
    }

    #[must_use]
    pub fn default_delay(&self) -> f64 {
        self.default_delay
    }

    fn host_state(&self, host: &str) -> Arc<Mutex<HostState>> {
        Arc::clone(
            self.hosts
                .entry(host.to_string())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(HostState::new(
                        self.default_delay,
                        self.max_concurrent_per_host,
                    )))
                })
                .value(),
        )
    }

    /// Suspend until a request to the URL's host may be dispatched, then
    /// record the dispatch.
    ///
    /// Consecutive returns for one host are separated by at least the host's
    /// current crawl delay, and `active_requests` never exceeds the host's
    /// concurrency ceiling.
    pub async fn wait(&self, url: &str) {
        let host = extract_host(url);
        let state = self.host_state(&host);

        loop {
            let sleep_for = {
                let mut guard = state.lock().await;

                if guard.active_requests >= guard.max_concurrent {
                    Duration::from_millis(100)
                } else {
                    let since_last = guard
                        .last_request
                        .map_or(f64::MAX, |t| t.elapsed().as_secs_f64());

                    if since_last < guard.crawl_delay {
                        let wait = guard.crawl_delay - since_last;
                        debug!("Rate limiting {host}: waiting {wait:.1}s");
                        Duration::from_secs_f64(wait)
                    } else {
                        guard.last_request = Some(Instant::now());
                        guard.active_requests += 1;
                        return;
                    }
                }
            };
            tokio::time::sleep(sleep_for).await;
        }
    }

    /// Record a completed request and adapt the host's delay.
    pub async fn request_completed(&self, url: &str, response_time: f64, status: u16) {
        let host = extract_host(url);
        let state = self.host_state(&host);
        let mut guard = state.lock().await;

        guard.active_requests = guard.active_requests.saturating_sub(1);
        guard.push_sample(RequestSample {
            at: Instant::now(),
            response_time,
            status,
        });

        self.adjust_delay(&host, &mut guard, status, response_time);
    }

    fn adjust_delay(&self, host: &str, state: &mut HostState, status: u16, response_time: f64) {
        if status == 429 {
            state.crawl_delay *= 2.0;
            info!("Rate limit hit for {host}, increasing delay to {:.1}s", state.crawl_delay);
        } else if status >= 500 {
            state.crawl_delay *= 1.5;
            info!("Server error from {host}, increasing delay to {:.1}s", state.crawl_delay);
        } else if response_time > 10.0 {
            state.crawl_delay *= 1.2;
            info!("Slow response from {host}, increasing delay to {:.1}s", state.crawl_delay);
        } else if status == 200 && response_time < 2.0 {
            state.crawl_delay = self.default_delay.max(state.crawl_delay * 0.95);
        }
    }

    /// Raise the host's crawl delay to at least `delay` seconds.
    ///
    /// Used by the robots policy when a `Crawl-delay` directive is present;
    /// never lowers an already higher delay.
    pub async fn raise_crawl_delay(&self, host: &str, delay: f64) {
        let state = self.host_state(host);
        let mut guard = state.lock().await;
        if delay > guard.crawl_delay {
            info!("Setting crawl delay for {host}: {delay:.1}s");
            guard.crawl_delay = delay;
        }
    }

    /// Current crawl delay for a host.
    pub async fn crawl_delay(&self, host: &str) -> f64 {
        let state = self.host_state(host);
        let delay = state.lock().await.crawl_delay;
        delay
    }

    /// Number of samples recorded for a host.
    pub async fn sample_count(&self, host: &str) -> usize {
        let state = self.host_state(host);
        let count = state.lock().await.history.len();
        count
    }

    /// Statistics for every tracked host.
    pub async fn host_stats(&self) -> Vec<HostRateStats> {
        let mut stats = Vec::with_capacity(self.hosts.len());
        let entries: Vec<(String, Arc<Mutex<HostState>>)> = self
            .hosts
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();

        for (host, state) in entries {
            let guard = state.lock().await;
            let recent: Vec<&RequestSample> = guard
                .history
                .iter()
                .filter(|s| s.at.elapsed() < Duration::from_secs(RECENT_WINDOW_SECS))
                .collect();
            let avg_response_time = if recent.is_empty() {
                0.0
            } else {
                recent.iter().map(|s| s.response_time).sum::<f64>() / recent.len() as f64
            };

            stats.push(HostRateStats {
                host,
                crawl_delay: guard.crawl_delay,
                max_concurrent: guard.max_concurrent,
                active_requests: guard.active_requests,
                recent_requests: recent.len(),
                avg_response_time,
            });
        }
        stats
    }
}
