//! Shared configuration constants for the crawler
//!
//! This module contains default values used throughout the codebase to
//! ensure consistency and avoid magic numbers.

/// Default delay between consecutive requests to the same host: 1 second
///
/// Conservative default that respects server resources. robots.txt
/// `Crawl-delay` directives can only raise this value, and the adaptive
/// rate limiter never drops below it.
pub const DEFAULT_CRAWL_DELAY_SECS: f64 = 1.0;

/// Default maximum concurrent requests per host
pub const DEFAULT_MAX_CONCURRENT_PER_HOST: usize = 1;

/// User agent sent on every outbound request
pub const DEFAULT_USER_AGENT: &str = "CanopyCrawler/1.0";

/// Default page budget: stop after this many successful dequeues
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Priority assigned to seed URLs when the frontier is initialized
pub const SEED_PRIORITY: i32 = 1000;

/// Total timeout for a page fetch, in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for robots.txt retrieval, in seconds
///
/// Short on purpose: a slow robots endpoint should not stall the frontier,
/// and a failed fetch is treated as permissive anyway.
pub const ROBOTS_TIMEOUT_SECS: u64 = 10;

/// Timeout for stylesheet downloads, in seconds
pub const CSS_TIMEOUT_SECS: u64 = 10;

/// Default cap on stylesheets downloaded per page
pub const DEFAULT_MAX_CSS_FILES: usize = 50;

/// Default interval between progress reports, in seconds
pub const DEFAULT_REPORT_INTERVAL_SECS: u64 = 30;

/// Visited-set size at which the watermark truncation runs
///
/// Above this many canonical URLs the dedup manager keeps only the most
/// recent half. Truncated URLs may be recrawled; the trade-off is bounded
/// memory on long crawls.
pub const VISITED_WATERMARK: usize = 50_000;

/// Default bloom pre-filter capacity (bit array is 10x this)
pub const DEFAULT_BLOOM_CAPACITY: usize = 100_000;

/// Default maximum link-following depth for graph crawling
pub const DEFAULT_GRAPH_MAX_DEPTH: usize = 3;

/// Default cap on distinct hosts in cross-domain modes
pub const DEFAULT_MAX_DOMAINS: usize = 100;

/// Reputation score below which non-seed hosts are rejected in graph modes
pub const DEFAULT_MIN_DOMAIN_SCORE: f64 = 0.1;

/// Default viewport width for the renderer session
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1920;
/// Default viewport height for the renderer session
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 1080;

/// Navigation timeout for renderer sessions, in seconds
pub const NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Post-navigation settle time before a screenshot, in seconds
///
/// Lazy-loaded media and consent banners usually finish within this window.
pub const SCREENSHOT_SETTLE_SECS: u64 = 3;

/// Default DOM tree traversal depth cap
pub const DEFAULT_DOM_MAX_DEPTH: usize = 8;
