//! Composable feature pipeline
//!
//! A feature observes the crawl through four hooks: `initialize`,
//! `before_crawl`, `process_url`, and `finalize`. The pipeline invokes each
//! hook on every registered feature in registration order; a hook failure is
//! logged and suppressed so one feature can never abort the crawl or starve
//! the features behind it.

pub mod css_download;
pub mod dom_extraction;
pub mod graph_expansion;
pub mod screenshot;

pub use css_download::CssDownloadFeature;
pub use dom_extraction::DomExtractionFeature;
pub use graph_expansion::GraphExpansionFeature;
pub use screenshot::ScreenshotFeature;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::crawl_engine::context::CrawlContext;
use crate::crawl_engine::fetch::PageResult;

/// A collaborator invoked at each crawl lifecycle point.
#[async_trait]
pub trait CrawlerFeature: Send + Sync {
    /// Stable name used in logs and ordering diagnostics.
    fn name(&self) -> &'static str;

    /// Called once when the crawler starts, in registration order.
    async fn initialize(&self, ctx: &CrawlContext) -> Result<()>;

    /// Called after every feature has initialized, before the first fetch.
    async fn before_crawl(&self, ctx: &CrawlContext) -> Result<()>;

    /// Called with the result of every processed URL.
    async fn process_url(&self, url: &str, result: &PageResult, ctx: &CrawlContext) -> Result<()>;

    /// Called once after the loop exits, in registration order.
    async fn finalize(&self, ctx: &CrawlContext) -> Result<()>;
}

/// Registration-ordered feature list.
#[derive(Default)]
pub struct FeaturePipeline {
    features: Vec<Arc<dyn CrawlerFeature>>,
}

impl FeaturePipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, feature: Arc<dyn CrawlerFeature>) {
        self.features.push(feature);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    /// Run `initialize` on every feature.
    pub async fn initialize(&self, ctx: &CrawlContext) {
        for feature in &self.features {
            if let Err(e) = feature.initialize(ctx).await {
                warn!("Feature {} failed to initialize: {e:#}", feature.name());
            }
        }
    }

    /// Run `before_crawl` on every feature.
    pub async fn before_crawl(&self, ctx: &CrawlContext) {
        for feature in &self.features {
            if let Err(e) = feature.before_crawl(ctx).await {
                warn!("Feature {} failed in before_crawl: {e:#}", feature.name());
            }
        }
    }

    /// Run `process_url` on every feature, serially, in registration order.
    pub async fn process_url(&self, url: &str, result: &PageResult, ctx: &CrawlContext) {
        for feature in &self.features {
            if let Err(e) = feature.process_url(url, result, ctx).await {
                warn!("Feature {} failed processing {url}: {e:#}", feature.name());
            }
        }
    }

    /// Run `finalize` on every feature.
    pub async fn finalize(&self, ctx: &CrawlContext) {
        for feature in &self.features {
            if let Err(e) = feature.finalize(ctx).await {
                warn!("Feature {} failed to finalize: {e:#}", feature.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl_engine::frontier::Frontier;
    use crate::monitoring::MetricsCollector;
    use crate::storage::PageStore;
    use parking_lot::Mutex;

    fn context() -> CrawlContext {
        CrawlContext::new(
            Arc::new(Frontier::new()),
            Arc::new(PageStore::new("crawl_data", false)),
            Arc::new(MetricsCollector::new()),
            reqwest::Client::new(),
            vec![],
            "CanopyCrawler/1.0".to_string(),
        )
    }

    struct RecordingFeature {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl CrawlerFeature for RecordingFeature {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn initialize(&self, _ctx: &CrawlContext) -> Result<()> {
            self.log.lock().push(format!("{}:initialize", self.name));
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }

        async fn before_crawl(&self, _ctx: &CrawlContext) -> Result<()> {
            self.log.lock().push(format!("{}:before_crawl", self.name));
            Ok(())
        }

        async fn process_url(
            &self,
            url: &str,
            _result: &PageResult,
            _ctx: &CrawlContext,
        ) -> Result<()> {
            self.log.lock().push(format!("{}:process:{url}", self.name));
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }

        async fn finalize(&self, _ctx: &CrawlContext) -> Result<()> {
            self.log.lock().push(format!("{}:finalize", self.name));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = FeaturePipeline::new();
        pipeline.register(Arc::new(RecordingFeature {
            name: "first",
            log: Arc::clone(&log),
            fail: false,
        }));
        pipeline.register(Arc::new(RecordingFeature {
            name: "second",
            log: Arc::clone(&log),
            fail: false,
        }));

        let ctx = context();
        pipeline.initialize(&ctx).await;
        pipeline
            .process_url("https://a.test", &PageResult::default(), &ctx)
            .await;
        pipeline.finalize(&ctx).await;

        let entries = log.lock().clone();
        assert_eq!(
            entries,
            vec![
                "first:initialize",
                "second:initialize",
                "first:process:https://a.test",
                "second:process:https://a.test",
                "first:finalize",
                "second:finalize",
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_feature_does_not_stop_later_features() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = FeaturePipeline::new();
        pipeline.register(Arc::new(RecordingFeature {
            name: "broken",
            log: Arc::clone(&log),
            fail: true,
        }));
        pipeline.register(Arc::new(RecordingFeature {
            name: "healthy",
            log: Arc::clone(&log),
            fail: false,
        }));

        let ctx = context();
        pipeline
            .process_url("https://a.test", &PageResult::default(), &ctx)
            .await;

        let entries = log.lock().clone();
        assert!(entries.contains(&"broken:process:https://a.test".to_string()));
        assert!(entries.contains(&"healthy:process:https://a.test".to_string()));
    }
}
