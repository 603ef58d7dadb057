//! Per-host robots.txt policy
//!
//! On first contact with a host, `https://<host>/robots.txt` is fetched with
//! a short timeout and parsed once. The cached view answers every later
//! `can_crawl` query for that host. A fetch failure is treated as permissive:
//! robots unavailability never blocks a crawl.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use log::{debug, info, warn};
use texting_robots::Robot;
use tokio::sync::Mutex;

use super::rate_limiter::RateLimiter;
use crate::utils::extract_host;

/// Parsed robots view for one host.
pub struct HostRobots {
    /// Raw robots.txt body, empty when unavailable
    pub body: String,
    matcher: Option<Robot>,
    /// False when the applicable group carries `Disallow: /`
    pub user_agent_allowed: bool,
    /// Crawl-delay for our user agent, when present and parseable
    pub crawl_delay: Option<f64>,
}

/// Fetches, caches, and answers robots.txt questions per host.
pub struct RobotsPolicy {
    http: reqwest::Client,
    user_agent: String,
    timeout: Duration,
    hosts: DashMap<String, Arc<HostRobots>>,
    // Serializes first-contact fetches so a host is only fetched once
    init_lock: Mutex<()>,
}

impl RobotsPolicy {
    #[must_use]
    pub fn new(http: reqwest::Client, user_agent: String, timeout: Duration) -> Self {
        Self {
            http,
            user_agent,
            timeout,
            hosts: DashMap::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Make sure the host's robots.txt has been fetched and parsed.
    pub async fn ensure_host(&self, host: &str, rate_limiter: &RateLimiter) {
        if self.hosts.contains_key(host) {
            return;
        }

        let _guard = self.init_lock.lock().await;
        if self.hosts.contains_key(host) {
            return;
        }

        let body = self.fetch_robots(host).await.unwrap_or_default();
        let entry = self.parse_host(host, body);

        if let Some(delay) = entry.crawl_delay {
            rate_limiter.raise_crawl_delay(host, delay).await;
        }

        self.hosts.insert(host.to_string(), Arc::new(entry));
    }

    /// Whether the URL may be fetched under the host's robots rules.
    ///
    /// Hosts that were never fetched (for example when `ensure_host` was
    /// skipped) are treated as permissive.
    #[must_use]
    pub fn can_crawl(&self, url: &str) -> (bool, String) {
        let host = extract_host(url);

        let Some(entry) = self.hosts.get(&host) else {
            return (true, "OK".to_string());
        };

        if !entry.user_agent_allowed {
            return (
                false,
                format!("user agent {} not allowed by robots.txt on {host}", self.user_agent),
            );
        }

        if let Some(matcher) = &entry.matcher {
            if !matcher.allowed(url) {
                return (false, format!("URL blocked by robots.txt: {url}"));
            }
        }

        (true, "OK".to_string())
    }

    /// Cached view for a host, if it has been initialized.
    #[must_use]
    pub fn host_entry(&self, host: &str) -> Option<Arc<HostRobots>> {
        self.hosts.get(host).map(|e| Arc::clone(e.value()))
    }

    /// Parse a robots.txt body into a host entry. Exposed for tests.
    #[must_use]
    pub fn parse_host(&self, host: &str, body: String) -> HostRobots {
        if body.is_empty() {
            return HostRobots {
                body,
                matcher: None,
                user_agent_allowed: true,
                crawl_delay: None,
            };
        }

        match Robot::new(&self.user_agent, body.as_bytes()) {
            Ok(robot) => {
                // A root disallow under the applicable group blocks the whole host
                let user_agent_allowed = robot.allowed("/");
                if !user_agent_allowed {
                    warn!("Host {host} disallows crawling for {}", self.user_agent);
                }

                let crawl_delay = robot.delay.map(f64::from);
                if let Some(delay) = crawl_delay {
                    info!("robots.txt crawl-delay for {host}: {delay}s");
                }

                HostRobots {
                    body,
                    matcher: Some(robot),
                    user_agent_allowed,
                    crawl_delay,
                }
            }
            Err(e) => {
                warn!("Could not parse robots.txt for {host}: {e}");
                HostRobots {
                    body,
                    matcher: None,
                    user_agent_allowed: true,
                    crawl_delay: None,
                }
            }
        }
    }

    async fn fetch_robots(&self, host: &str) -> Option<String> {
        let robots_url = format!("https://{host}/robots.txt");
        debug!("Fetching {robots_url}");

        let response = self
            .http
            .get(&robots_url)
            .timeout(self.timeout)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
            Ok(resp) => {
                debug!("robots.txt for {host} returned HTTP {}", resp.status());
                None
            }
            Err(e) => {
                warn!("Could not fetch robots.txt for {host}: {e}");
                None
            }
        }
    }
}
