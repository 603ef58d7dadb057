//! Crawler configuration types
//!
//! `CrawlConfig` holds everything a crawl needs: seeds, budgets, politeness
//! defaults, retry policy, dedup tuning, storage, and the per-feature
//! option blocks. Instances come from [`CrawlerBuilder`](super::builder).

use std::path::PathBuf;

use crate::errors::{CrawlError, RetryPolicy};
use crate::graph::GraphConfig;
use crate::renderer::Viewport;
use crate::utils::constants::{
    DEFAULT_BLOOM_CAPACITY, DEFAULT_CRAWL_DELAY_SECS, DEFAULT_MAX_CONCURRENT_PER_HOST,
    DEFAULT_MAX_PAGES, DEFAULT_REPORT_INTERVAL_SECS, DEFAULT_USER_AGENT, REQUEST_TIMEOUT_SECS,
    ROBOTS_TIMEOUT_SECS,
};

/// Screenshot feature options.
#[derive(Debug, Clone)]
pub struct ScreenshotOptions {
    pub viewport: Viewport,
    pub headless: bool,
}

/// DOM extraction feature options.
#[derive(Debug, Clone)]
pub struct DomOptions {
    pub max_depth: usize,
    pub capture_screenshots: bool,
    pub component_selectors: Option<Vec<String>>,
}

/// CSS download feature options.
#[derive(Debug, Clone)]
pub struct CssOptions {
    pub max_css_files: usize,
}

/// Full crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub(crate) start_urls: Vec<String>,
    pub(crate) max_pages: usize,
    pub(crate) user_agent: String,
    pub(crate) default_delay: f64,
    pub(crate) max_concurrent_per_host: usize,
    pub(crate) request_timeout_secs: u64,
    pub(crate) robots_timeout_secs: u64,
    pub(crate) report_interval_secs: u64,
    pub(crate) retry: RetryPolicy,
    pub(crate) failure_threshold: u32,
    pub(crate) recovery_timeout_secs: u64,
    pub(crate) use_bloom: bool,
    pub(crate) bloom_capacity: usize,
    pub(crate) storage_root: PathBuf,
    pub(crate) compress: bool,
    pub(crate) screenshots: Option<ScreenshotOptions>,
    pub(crate) dom_extraction: Option<DomOptions>,
    pub(crate) graph: Option<GraphConfig>,
    pub(crate) css_download: Option<CssOptions>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_urls: Vec::new(),
            max_pages: DEFAULT_MAX_PAGES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_delay: DEFAULT_CRAWL_DELAY_SECS,
            max_concurrent_per_host: DEFAULT_MAX_CONCURRENT_PER_HOST,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            robots_timeout_secs: ROBOTS_TIMEOUT_SECS,
            report_interval_secs: DEFAULT_REPORT_INTERVAL_SECS,
            retry: RetryPolicy::default(),
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            use_bloom: true,
            bloom_capacity: DEFAULT_BLOOM_CAPACITY,
            storage_root: PathBuf::from("crawl_data"),
            compress: false,
            screenshots: None,
            dom_extraction: None,
            graph: None,
            css_download: None,
        }
    }
}

impl CrawlConfig {
    /// Check feature combinations that cannot work at runtime.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.start_urls.is_empty() {
            return Err(CrawlError::Config("at least one start URL is required".into()));
        }
        if self.dom_extraction.is_some() && self.screenshots.is_none() {
            return Err(CrawlError::Config(
                "DOM extraction requires the screenshot feature (it shares the renderer session)"
                    .into(),
            ));
        }
        if self.max_pages == 0 {
            return Err(CrawlError::Config("max_pages must be at least 1".into()));
        }
        Ok(())
    }
}
