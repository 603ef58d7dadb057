//! Per-host circuit breaker
//!
//! Detects hosts that fail consistently and short-circuits further attempts
//! until a recovery window has elapsed. Three states per host:
//! - Closed: normal operation, requests proceed
//! - Open: too many consecutive failures, requests fail fast
//! - `HalfOpen`: recovery window elapsed, a single probe is allowed

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::{debug, info, warn};
use serde::Serialize;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, requests proceed
    Closed,
    /// Recovery probe in progress
    HalfOpen,
    /// Failing, requests are refused
    Open,
}

/// Failure tracking for a single host
#[derive(Debug, Clone)]
pub struct HostHealth {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_attempts: u32,
    pub total_successes: u32,
    pub last_failure: Option<Instant>,
    pub last_opened: Option<Instant>,
}

impl HostHealth {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            total_attempts: 0,
            total_successes: 0,
            last_failure: None,
            last_opened: None,
        }
    }
}

/// Tracks host health and refuses calls to hosts that keep failing.
pub struct CircuitBreaker {
    hosts: DashMap<String, HostHealth>,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    /// # Arguments
    /// * `failure_threshold` - consecutive failures before the circuit opens
    /// * `recovery_timeout` - wait before allowing a half-open probe
    #[must_use]
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            hosts: DashMap::new(),
            failure_threshold,
            recovery_timeout,
        }
    }

    /// Whether a request to the host may proceed.
    ///
    /// An Open circuit whose recovery timeout has elapsed transitions to
    /// `HalfOpen` here and admits exactly one probe; while the probe is in
    /// flight further calls are refused.
    pub fn should_attempt(&self, host: &str) -> bool {
        let mut health = self
            .hosts
            .entry(host.to_string())
            .or_insert_with(HostHealth::new);

        match health.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let elapsed = health.last_failure.map(|t| t.elapsed());
                if elapsed.is_some_and(|e| e >= self.recovery_timeout) {
                    health.state = CircuitState::HalfOpen;
                    info!("Circuit breaker HALF-OPEN for host {host}, allowing one probe");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful request, closing the circuit.
    pub fn record_success(&self, host: &str) {
        let mut health = self
            .hosts
            .entry(host.to_string())
            .or_insert_with(HostHealth::new);

        health.total_attempts += 1;
        health.total_successes += 1;
        health.consecutive_failures = 0;
        if health.state != CircuitState::Closed {
            info!("Circuit breaker CLOSED for host {host}");
        }
        health.state = CircuitState::Closed;
    }

    /// Record a failed request, opening the circuit at the threshold.
    pub fn record_failure(&self, host: &str, error: &str) {
        let mut health = self
            .hosts
            .entry(host.to_string())
            .or_insert_with(HostHealth::new);

        health.total_attempts += 1;
        health.consecutive_failures += 1;
        health.last_failure = Some(Instant::now());

        let probe_failed = health.state == CircuitState::HalfOpen;
        if probe_failed || health.consecutive_failures >= self.failure_threshold {
            if health.state != CircuitState::Open {
                warn!(
                    "Circuit breaker OPEN for host {host} after {} consecutive failures. Last error: {error}",
                    health.consecutive_failures
                );
            }
            health.state = CircuitState::Open;
            health.last_opened = Some(Instant::now());
        } else {
            debug!(
                "Circuit breaker failure for host {host} ({}/{}): {error}",
                health.consecutive_failures, self.failure_threshold
            );
        }
    }

    /// Current state for a host, Closed if the host has not been seen.
    #[must_use]
    pub fn state(&self, host: &str) -> CircuitState {
        self.hosts
            .get(host)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    #[must_use]
    pub fn health(&self, host: &str) -> Option<HostHealth> {
        self.hosts.get(host).map(|h| h.clone())
    }

    /// Snapshot of every tracked host's state, for reporting.
    #[must_use]
    pub fn states(&self) -> HashMap<String, CircuitState> {
        self.hosts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().state))
            .collect()
    }

    /// Hosts currently refusing requests.
    #[must_use]
    pub fn open_hosts(&self) -> Vec<String> {
        self.hosts
            .iter()
            .filter(|entry| entry.value().state == CircuitState::Open)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Reset a host to Closed, clearing its failure history.
    pub fn reset(&self, host: &str) {
        if let Some(mut health) = self.hosts.get_mut(host) {
            *health = HostHealth::new();
        }
    }
}
