//! Graph expansion feature
//!
//! Feeds the frontier from each crawled page's link inventory, through the
//! graph manager's scope rules and the link prioritizer. Collects every
//! emitted link for the final statistics summary.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;

use super::CrawlerFeature;
use crate::crawl_engine::context::CrawlContext;
use crate::crawl_engine::fetch::PageResult;
use crate::graph::{GraphConfig, GraphManager, LinkInfo};

/// Links scoring above this are logged as high-priority finds.
const HIGH_PRIORITY_THRESHOLD: i32 = 150;

/// Discovers and enqueues links from crawled pages.
pub struct GraphExpansionFeature {
    manager: GraphManager,
    discovered: Mutex<Vec<LinkInfo>>,
}

impl GraphExpansionFeature {
    #[must_use]
    pub fn new(config: GraphConfig) -> Self {
        Self {
            manager: GraphManager::new(config),
            discovered: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn manager(&self) -> &GraphManager {
        &self.manager
    }
}

#[async_trait]
impl CrawlerFeature for GraphExpansionFeature {
    fn name(&self) -> &'static str {
        "graph_expansion"
    }

    async fn initialize(&self, ctx: &CrawlContext) -> Result<()> {
        self.manager.initialize_seeds(ctx.seed_urls());
        info!("Graph crawling initialized with {} seeds", ctx.seed_urls().len());
        Ok(())
    }

    async fn before_crawl(&self, _ctx: &CrawlContext) -> Result<()> {
        info!("Graph crawling ready");
        Ok(())
    }

    async fn process_url(&self, url: &str, result: &PageResult, ctx: &CrawlContext) -> Result<()> {
        let Some(parsed) = &result.parsed else {
            return Ok(());
        };

        let body = result.content.as_deref().unwrap_or("");
        let links = self.manager.extract_links(url, &parsed.links, body);
        if links.is_empty() {
            return Ok(());
        }

        info!("Discovered {} links from {url}", links.len());

        let high_priority = links
            .iter()
            .filter(|l| l.priority > HIGH_PRIORITY_THRESHOLD)
            .count();
        if high_priority > 0 {
            debug!("Found {high_priority} high-priority links on {url}");
        }

        for link in &links {
            ctx.enqueue(&link.url, link.priority);
        }

        self.discovered.lock().extend(links);
        Ok(())
    }

    async fn finalize(&self, _ctx: &CrawlContext) -> Result<()> {
        let stats = self.manager.stats();
        let discovered = self.discovered.lock();

        info!("Graph crawling statistics:");
        info!("  Discovered domains: {}", stats.discovered_domains);
        info!("  Total links discovered: {}", discovered.len());
        info!("  Max depth reached: {}", stats.max_depth_reached);

        if !discovered.is_empty() {
            let mut per_host: HashMap<&str, usize> = HashMap::new();
            for link in discovered.iter() {
                *per_host.entry(link.host.as_str()).or_default() += 1;
            }
            let mut top: Vec<(&str, usize)> = per_host.into_iter().collect();
            top.sort_by(|a, b| b.1.cmp(&a.1));
            let top_summary: Vec<String> = top
                .iter()
                .take(3)
                .map(|(host, count)| format!("{host}({count})"))
                .collect();
            info!("  Top discovered hosts: {}", top_summary.join(", "));

            for link in discovered.iter().take(3) {
                info!("    - {} (priority {})", link.url, link.priority);
            }
        }

        info!("Graph crawling completed");
        Ok(())
    }
}
