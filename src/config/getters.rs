//! Read accessors for `CrawlConfig`.

use std::path::Path;

use super::types::{CrawlConfig, CssOptions, DomOptions, ScreenshotOptions};
use crate::errors::RetryPolicy;
use crate::graph::GraphConfig;

impl CrawlConfig {
    #[must_use]
    pub fn start_urls(&self) -> &[String] {
        &self.start_urls
    }

    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn default_delay(&self) -> f64 {
        self.default_delay
    }

    #[must_use]
    pub fn max_concurrent_per_host(&self) -> usize {
        self.max_concurrent_per_host
    }

    #[must_use]
    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
    }

    #[must_use]
    pub fn robots_timeout_secs(&self) -> u64 {
        self.robots_timeout_secs
    }

    #[must_use]
    pub fn report_interval_secs(&self) -> u64 {
        self.report_interval_secs
    }

    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    #[must_use]
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    #[must_use]
    pub fn recovery_timeout_secs(&self) -> u64 {
        self.recovery_timeout_secs
    }

    #[must_use]
    pub fn use_bloom(&self) -> bool {
        self.use_bloom
    }

    #[must_use]
    pub fn bloom_capacity(&self) -> usize {
        self.bloom_capacity
    }

    #[must_use]
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    #[must_use]
    pub fn compress(&self) -> bool {
        self.compress
    }

    #[must_use]
    pub fn screenshots(&self) -> Option<&ScreenshotOptions> {
        self.screenshots.as_ref()
    }

    #[must_use]
    pub fn dom_extraction(&self) -> Option<&DomOptions> {
        self.dom_extraction.as_ref()
    }

    #[must_use]
    pub fn graph(&self) -> Option<&GraphConfig> {
        self.graph.as_ref()
    }

    #[must_use]
    pub fn css_download(&self) -> Option<&CssOptions> {
        self.css_download.as_ref()
    }
}
