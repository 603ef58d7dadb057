//! DOM extraction feature
//!
//! Consumes the renderer session published by the screenshot feature and
//! produces the `dom_trees` artifact plus component screenshots for every
//! successful page. Configuration requires the screenshot feature, so the
//! session is present whenever this feature runs.

use anyhow::Result;
use async_trait::async_trait;
use log::info;

use super::CrawlerFeature;
use crate::crawl_engine::context::CrawlContext;
use crate::crawl_engine::fetch::PageResult;
use crate::dom::DomTreeExtractor;

/// Extracts DOM trees and component screenshots per crawled URL.
pub struct DomExtractionFeature {
    extractor: DomTreeExtractor,
    max_depth: usize,
}

impl DomExtractionFeature {
    #[must_use]
    pub fn new(
        max_depth: usize,
        capture_screenshots: bool,
        component_selectors: Option<Vec<String>>,
    ) -> Self {
        Self {
            extractor: DomTreeExtractor::new(max_depth, capture_screenshots, component_selectors),
            max_depth,
        }
    }
}

#[async_trait]
impl CrawlerFeature for DomExtractionFeature {
    fn name(&self) -> &'static str {
        "dom_extraction"
    }

    async fn initialize(&self, _ctx: &CrawlContext) -> Result<()> {
        info!("DOM extraction initialized (max_depth={})", self.max_depth);
        Ok(())
    }

    async fn before_crawl(&self, _ctx: &CrawlContext) -> Result<()> {
        info!("DOM extraction ready");
        Ok(())
    }

    async fn process_url(&self, url: &str, result: &PageResult, ctx: &CrawlContext) -> Result<()> {
        if !result.is_success() {
            return Ok(());
        }

        let Some(session) = ctx.session().await else {
            anyhow::bail!("renderer session not available; screenshot feature must run first");
        };

        let report = self
            .extractor
            .extract(session.as_ref(), url, ctx.storage())
            .await?;
        info!(
            "DOM tree for {url}: {} nodes, {} component screenshots",
            report.total_nodes, report.component_screenshots
        );
        Ok(())
    }

    async fn finalize(&self, _ctx: &CrawlContext) -> Result<()> {
        info!("DOM extraction cleaned up");
        Ok(())
    }
}
