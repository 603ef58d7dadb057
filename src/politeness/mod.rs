//! Per-host politeness: robots.txt policy and adaptive rate limiting.

pub mod rate_limiter;
pub mod robots;

pub use rate_limiter::{HostRateStats, RateLimiter};
pub use robots::{HostRobots, RobotsPolicy};
