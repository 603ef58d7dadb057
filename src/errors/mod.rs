//! Error classification, retry with backoff, and per-host fail-fast
//!
//! Every failure in the fetch path is classified into an [`ErrorKind`] that
//! drives the retry decision: timeouts, connection failures, 5xx, and 429
//! are retried with exponential backoff and jitter; other kinds surface
//! immediately. A per-host circuit breaker wraps the whole retry loop so a
//! consistently failing host stops costing attempts at all.

pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitState, HostHealth};

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{error, info, warn};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// Classification of crawl failures, independent of the error's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NetworkTimeout,
    ConnectionError,
    HttpClientError,
    HttpServerError,
    RateLimited,
    ParsingError,
    RenderingError,
    StorageError,
    UnknownError,
}

impl ErrorKind {
    /// Whether this kind is worth another attempt by default.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::NetworkTimeout | Self::ConnectionError | Self::HttpServerError | Self::RateLimited
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network_timeout",
            Self::ConnectionError => "connection_error",
            Self::HttpClientError => "http_client_error",
            Self::HttpServerError => "http_server_error",
            Self::RateLimited => "rate_limited",
            Self::ParsingError => "parsing_error",
            Self::RenderingError => "rendering_error",
            Self::StorageError => "storage_error",
            Self::UnknownError => "unknown_error",
        }
    }
}

/// Error type for crawl operations.
#[derive(Debug, Error, Clone)]
pub enum CrawlError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("parse failure: {0}")]
    Parse(String),
    #[error("render failure: {0}")]
    Render(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("circuit breaker open for host {0}")]
    CircuitOpen(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("crawl error: {0}")]
    Other(String),
}

impl CrawlError {
    /// Classify this error for the retry policy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::NetworkTimeout,
            Self::Connection(_) => ErrorKind::ConnectionError,
            Self::HttpStatus { status: 429, .. } => ErrorKind::RateLimited,
            Self::HttpStatus { status, .. } if (500..600).contains(status) => {
                ErrorKind::HttpServerError
            }
            Self::HttpStatus { .. } => ErrorKind::HttpClientError,
            Self::Parse(_) => ErrorKind::ParsingError,
            Self::Render(_) => ErrorKind::RenderingError,
            Self::Storage(_) => ErrorKind::StorageError,
            Self::CircuitOpen(_) | Self::Config(_) | Self::Other(_) => ErrorKind::UnknownError,
        }
    }

    /// Map a `reqwest` failure onto the crawl error taxonomy.
    #[must_use]
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(ToString::to_string).unwrap_or_default(),
            }
        } else {
            Self::Other(err.to_string())
        }
    }
}

impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, Serialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 60.0,
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the retry following `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32, kind: ErrorKind) -> Duration {
        let mut delay =
            self.base_delay_secs * self.exponential_base.powi(attempt.saturating_sub(1) as i32);

        // Rate limiting gets an extra doubling on top of the backoff curve
        if kind == ErrorKind::RateLimited {
            delay *= 2.0;
        }

        delay = delay.min(self.max_delay_secs);

        if self.jitter {
            delay += delay * 0.1 * rand::rng().random::<f64>();
        }

        Duration::from_secs_f64(delay)
    }
}

/// A single recorded failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub url: String,
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub attempt: u32,
}

/// Aggregated view of everything that failed during a crawl.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ErrorSummary {
    pub total_errors: usize,
    pub failed_urls: usize,
    pub error_kinds: HashMap<String, usize>,
    pub host_errors: HashMap<String, usize>,
    pub circuit_breaker_states: HashMap<String, CircuitState>,
    /// Display-capped list of URLs that exhausted their retries
    pub failed_url_sample: Vec<String>,
}

/// How many failed URLs the final report lists at most.
const FAILED_URL_DISPLAY_CAP: usize = 25;

/// Retry executor with per-host circuit breaking and error bookkeeping.
pub struct ErrorHandler {
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    history: parking_lot::Mutex<Vec<ErrorRecord>>,
    failed_urls: DashMap<String, Vec<ErrorRecord>>,
}

impl ErrorHandler {
    #[must_use]
    pub fn new(policy: RetryPolicy, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            policy,
            breaker: Arc::new(CircuitBreaker::new(failure_threshold, recovery_timeout)),
            history: parking_lot::Mutex::new(Vec::new()),
            failed_urls: DashMap::new(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Run `op` with retry and circuit-breaker protection.
    ///
    /// Retryable failures back off exponentially (with jitter, and an extra
    /// doubling for 429) before the next attempt. Non-retryable failures and
    /// exhausted attempts surface the last error. Success clears the URL's
    /// failure history.
    pub async fn execute_with_retry<F, Fut, T>(
        &self,
        mut op: F,
        url: &str,
        host: &str,
    ) -> Result<T, CrawlError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CrawlError>>,
    {
        let mut last_error = CrawlError::Other("no attempts made".to_string());

        for attempt in 1..=self.policy.max_attempts {
            if !self.breaker.should_attempt(host) {
                warn!("Circuit breaker refusing {url} (host {host})");
                return Err(CrawlError::CircuitOpen(host.to_string()));
            }

            match op().await {
                Ok(value) => {
                    self.breaker.record_success(host);
                    self.failed_urls.remove(url);
                    return Ok(value);
                }
                Err(err) => {
                    let kind = err.kind();
                    self.breaker.record_failure(host, &err.to_string());
                    self.record(url, &err, attempt);

                    if attempt < self.policy.max_attempts {
                        warn!(
                            "Attempt {attempt}/{} failed for {url}: {} - {err}",
                            self.policy.max_attempts,
                            kind.as_str()
                        );
                    } else {
                        error!(
                            "Attempt {attempt}/{} failed for {url}: {} - {err}",
                            self.policy.max_attempts,
                            kind.as_str()
                        );
                    }

                    if !kind.is_retryable() {
                        return Err(err);
                    }

                    if attempt < self.policy.max_attempts {
                        let delay = self.policy.delay_for(attempt, kind);
                        info!("Retrying {url} in {:.1}s (attempt {})", delay.as_secs_f64(), attempt + 1);
                        tokio::time::sleep(delay).await;
                    }
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }

    fn record(&self, url: &str, err: &CrawlError, attempt: u32) {
        let record = ErrorRecord {
            url: url.to_string(),
            kind: err.kind(),
            status: match err {
                CrawlError::HttpStatus { status, .. } => Some(*status),
                _ => None,
            },
            message: err.to_string(),
            timestamp: Utc::now(),
            attempt,
        };
        self.history.lock().push(record.clone());
        self.failed_urls.entry(url.to_string()).or_default().push(record);
    }

    /// URLs that still have failure entries (never succeeded).
    #[must_use]
    pub fn failed_urls(&self) -> Vec<String> {
        self.failed_urls.iter().map(|e| e.key().clone()).collect()
    }

    #[must_use]
    pub fn summary(&self) -> ErrorSummary {
        let history = self.history.lock();
        let mut error_kinds: HashMap<String, usize> = HashMap::new();
        let mut host_errors: HashMap<String, usize> = HashMap::new();

        for record in history.iter() {
            *error_kinds.entry(record.kind.as_str().to_string()).or_default() += 1;
            let host = crate::utils::extract_host(&record.url);
            *host_errors.entry(host).or_default() += 1;
        }

        let mut failed_url_sample: Vec<String> = self
            .failed_urls
            .iter()
            .take(FAILED_URL_DISPLAY_CAP)
            .map(|e| e.key().clone())
            .collect();
        failed_url_sample.sort();

        ErrorSummary {
            total_errors: history.len(),
            failed_urls: self.failed_urls.len(),
            error_kinds,
            host_errors,
            circuit_breaker_states: self.breaker.states(),
            failed_url_sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_secs: 0.01,
            max_delay_secs: 0.05,
            exponential_base: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_retries_server_errors_until_success() {
        let handler = ErrorHandler::new(quick_policy(), 10, Duration::from_secs(60));
        let calls = AtomicU32::new(0);

        let result = handler
            .execute_with_retry(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 1 {
                            Err(CrawlError::HttpStatus {
                                status: 503,
                                url: "https://a.test".into(),
                            })
                        } else {
                            Ok("body")
                        }
                    }
                },
                "https://a.test",
                "a.test",
            )
            .await;

        assert_eq!(result.ok(), Some("body"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // Success clears the failure entry for the URL
        assert!(handler.failed_urls().is_empty());
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let handler = ErrorHandler::new(quick_policy(), 10, Duration::from_secs(60));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = handler
            .execute_with_retry(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async {
                        Err(CrawlError::HttpStatus {
                            status: 404,
                            url: "https://a.test/missing".into(),
                        })
                    }
                },
                "https://a.test/missing",
                "a.test",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handler.failed_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_surface_last_error() {
        let handler = ErrorHandler::new(quick_policy(), 10, Duration::from_secs(60));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = handler
            .execute_with_retry(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(CrawlError::Timeout("slow".into())) }
                },
                "https://a.test",
                "a.test",
            )
            .await;

        assert!(matches!(result, Err(CrawlError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_open_circuit_fails_fast_without_calling_op() {
        let handler = ErrorHandler::new(quick_policy(), 2, Duration::from_secs(60));
        handler.breaker().record_failure("a.test", "down");
        handler.breaker().record_failure("a.test", "down");

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = handler
            .execute_with_retry(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                "https://a.test",
                "a.test",
            )
            .await;

        assert!(matches!(result, Err(CrawlError::CircuitOpen(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_backoff_growth_and_rate_limit_doubling() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::default()
        };

        let d1 = policy.delay_for(1, ErrorKind::HttpServerError);
        let d2 = policy.delay_for(2, ErrorKind::HttpServerError);
        assert_eq!(d2.as_secs_f64(), d1.as_secs_f64() * 2.0);

        let rate_limited = policy.delay_for(1, ErrorKind::RateLimited);
        assert_eq!(rate_limited.as_secs_f64(), d1.as_secs_f64() * 2.0);

        // Capped at max_delay (plus the 429 doubling applied before the cap)
        let deep = policy.delay_for(10, ErrorKind::HttpServerError);
        assert!(deep.as_secs_f64() <= policy.max_delay_secs);
    }

    #[test]
    fn test_error_kind_classification() {
        assert_eq!(CrawlError::Timeout("x".into()).kind(), ErrorKind::NetworkTimeout);
        assert_eq!(
            CrawlError::HttpStatus { status: 429, url: String::new() }.kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(
            CrawlError::HttpStatus { status: 502, url: String::new() }.kind(),
            ErrorKind::HttpServerError
        );
        assert_eq!(
            CrawlError::HttpStatus { status: 403, url: String::new() }.kind(),
            ErrorKind::HttpClientError
        );
        assert!(!ErrorKind::HttpClientError.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
    }
}
