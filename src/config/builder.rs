//! Fluent builder for crawlers
//!
//! The builder takes the seed URLs up front, layers feature and policy
//! options on top of the defaults, and validates the combination when the
//! crawler is built. Invalid combinations (DOM extraction without the
//! screenshot feature it shares a renderer session with) fail at build
//! time, not mid-crawl.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::types::{CrawlConfig, CssOptions, DomOptions, ScreenshotOptions};
use crate::crawl_engine::Crawler;
use crate::errors::{CrawlError, RetryPolicy};
use crate::graph::{CrawlMode, GraphConfig};
use crate::renderer::Viewport;
use crate::utils::constants::{DEFAULT_DOM_MAX_DEPTH, DEFAULT_MAX_CSS_FILES};

/// Builder for a configured [`Crawler`].
pub struct CrawlerBuilder {
    config: CrawlConfig,
}

impl CrawlerBuilder {
    /// Start a builder with the frontier's seed URLs.
    #[must_use]
    pub fn new(start_urls: Vec<String>) -> Self {
        let mut config = CrawlConfig::default();
        config.start_urls = start_urls;
        Self { config }
    }

    /// Hard cap on successful dequeues.
    #[must_use]
    pub fn max_pages(mut self, count: usize) -> Self {
        self.config.max_pages = count;
        self
    }

    /// Enable full-page screenshots.
    #[must_use]
    pub fn with_screenshots(mut self, viewport: Viewport, headless: bool) -> Self {
        self.config.screenshots = Some(ScreenshotOptions { viewport, headless });
        self
    }

    /// Enable DOM tree extraction. Requires [`with_screenshots`](Self::with_screenshots).
    #[must_use]
    pub fn with_dom_extraction(
        mut self,
        max_depth: usize,
        capture_screenshots: bool,
        component_selectors: Option<Vec<String>>,
    ) -> Self {
        self.config.dom_extraction = Some(DomOptions {
            max_depth,
            capture_screenshots,
            component_selectors,
        });
        self
    }

    /// Enable DOM tree extraction with default depth and selectors.
    #[must_use]
    pub fn with_default_dom_extraction(self) -> Self {
        self.with_dom_extraction(DEFAULT_DOM_MAX_DEPTH, true, None)
    }

    /// Enable graph expansion with the given mode and limits.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn with_graph_crawling(
        mut self,
        mode: CrawlMode,
        max_depth: usize,
        max_domains: usize,
        allowed_domains: Option<HashSet<String>>,
        blocked_domains: Option<HashSet<String>>,
        priority_domains: Option<HashSet<String>>,
    ) -> Self {
        self.config.graph = Some(GraphConfig {
            mode,
            max_depth,
            max_domains,
            allowed_domains: allowed_domains.unwrap_or_default(),
            blocked_domains: blocked_domains.unwrap_or_default(),
            priority_domains: priority_domains.unwrap_or_default(),
            ..GraphConfig::default()
        });
        self
    }

    /// Enable graph expansion from a prepared configuration.
    #[must_use]
    pub fn with_graph_config(mut self, graph: GraphConfig) -> Self {
        self.config.graph = Some(graph);
        self
    }

    /// Keywords biasing link priority (used by `Focused` mode).
    #[must_use]
    pub fn keyword_filters(mut self, keywords: Vec<String>) -> Self {
        if let Some(graph) = self.config.graph.as_mut() {
            graph.keyword_filters = keywords;
        }
        self
    }

    /// Enable stylesheet downloads, capped per page.
    #[must_use]
    pub fn with_css_download(mut self, max_css_files: usize) -> Self {
        self.config.css_download = Some(CssOptions { max_css_files });
        self
    }

    /// Enable stylesheet downloads with the default cap.
    #[must_use]
    pub fn with_default_css_download(self) -> Self {
        self.with_css_download(DEFAULT_MAX_CSS_FILES)
    }

    /// Politeness defaults: per-host delay, concurrency ceiling, user agent.
    #[must_use]
    pub fn rate_limit(
        mut self,
        default_delay: f64,
        max_concurrent_per_host: usize,
        user_agent: impl Into<String>,
    ) -> Self {
        self.config.default_delay = default_delay;
        self.config.max_concurrent_per_host = max_concurrent_per_host;
        self.config.user_agent = user_agent.into();
        self
    }

    /// Retry policy for transient fetch failures.
    #[must_use]
    pub fn retry(mut self, max_attempts: u32, base_delay: f64, max_delay: f64, jitter: bool) -> Self {
        self.config.retry = RetryPolicy {
            max_attempts,
            base_delay_secs: base_delay,
            max_delay_secs: max_delay,
            jitter,
            ..RetryPolicy::default()
        };
        self
    }

    /// Circuit breaker thresholds.
    #[must_use]
    pub fn circuit_breaker(mut self, failure_threshold: u32, recovery_timeout_secs: u64) -> Self {
        self.config.failure_threshold = failure_threshold;
        self.config.recovery_timeout_secs = recovery_timeout_secs;
        self
    }

    /// Dedup tuning: bloom pre-filter capacity and on/off switch.
    #[must_use]
    pub fn deduplication(mut self, bloom_capacity: usize, use_bloom: bool) -> Self {
        self.config.bloom_capacity = bloom_capacity;
        self.config.use_bloom = use_bloom;
        self
    }

    /// Artifact root directory and compression switch.
    #[must_use]
    pub fn storage(mut self, root: impl Into<PathBuf>, compress: bool) -> Self {
        self.config.storage_root = root.into();
        self.config.compress = compress;
        self
    }

    /// Progress report interval in seconds.
    #[must_use]
    pub fn report_interval(mut self, secs: u64) -> Self {
        self.config.report_interval_secs = secs;
        self
    }

    /// The assembled configuration, validated.
    pub fn build_config(self) -> Result<CrawlConfig, CrawlError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the crawler.
    pub fn build(self) -> Result<Crawler, CrawlError> {
        Crawler::new(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_extraction_requires_screenshots() {
        let result = CrawlerBuilder::new(vec!["https://a.test".to_string()])
            .with_default_dom_extraction()
            .build_config();
        assert!(matches!(result, Err(CrawlError::Config(_))));

        let result = CrawlerBuilder::new(vec!["https://a.test".to_string()])
            .with_screenshots(Viewport::default(), true)
            .with_default_dom_extraction()
            .build_config();
        assert!(result.is_ok());
    }

    #[test]
    fn test_seeds_are_required() {
        let result = CrawlerBuilder::new(Vec::new()).build_config();
        assert!(matches!(result, Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_defaults() {
        let config = CrawlerBuilder::new(vec!["https://a.test".to_string()])
            .build_config()
            .expect("valid config");

        assert_eq!(config.max_pages(), 100);
        assert_eq!(config.user_agent(), "CanopyCrawler/1.0");
        assert_eq!(config.default_delay(), 1.0);
        assert!(config.use_bloom());
        assert!(!config.compress());
        assert!(config.screenshots().is_none());
        assert!(config.graph().is_none());
        assert!(config.css_download().is_none());
    }

    #[test]
    fn test_option_plumbing() {
        let config = CrawlerBuilder::new(vec!["https://a.test".to_string()])
            .max_pages(7)
            .rate_limit(2.5, 3, "TestBot/0.1")
            .retry(5, 0.5, 30.0, false)
            .deduplication(5000, false)
            .storage("out", true)
            .with_css_download(10)
            .with_graph_crawling(CrawlMode::Whitelist, 2, 10, None, None, None)
            .build_config()
            .expect("valid config");

        assert_eq!(config.max_pages(), 7);
        assert_eq!(config.user_agent(), "TestBot/0.1");
        assert_eq!(config.default_delay(), 2.5);
        assert_eq!(config.max_concurrent_per_host(), 3);
        assert_eq!(config.retry().max_attempts, 5);
        assert!(!config.retry().jitter);
        assert!(!config.use_bloom());
        assert!(config.compress());
        assert_eq!(config.css_download().map(|c| c.max_css_files), Some(10));
        assert_eq!(config.graph().map(|g| g.mode), Some(CrawlMode::Whitelist));
    }
}
