//! Shared crawl context
//!
//! The narrow surface features see. Features receive it per hook instead of
//! holding long-lived references back into the crawler, which keeps the
//! crawler/feature dependency one-directional.

use std::sync::Arc;

use log::debug;

use super::frontier::Frontier;
use crate::monitoring::MetricsCollector;
use crate::renderer::RendererSession;
use crate::storage::PageStore;

/// Callback surface handed to every feature hook.
pub struct CrawlContext {
    frontier: Arc<Frontier>,
    storage: Arc<PageStore>,
    metrics: Arc<MetricsCollector>,
    http: reqwest::Client,
    seed_urls: Vec<String>,
    user_agent: String,
    // Renderer session published by the screenshot feature, consumed by the
    // DOM feature; the slot keeps features from reaching into each other
    session: tokio::sync::Mutex<Option<Arc<dyn RendererSession>>>,
}

impl CrawlContext {
    #[must_use]
    pub fn new(
        frontier: Arc<Frontier>,
        storage: Arc<PageStore>,
        metrics: Arc<MetricsCollector>,
        http: reqwest::Client,
        seed_urls: Vec<String>,
        user_agent: String,
    ) -> Self {
        Self {
            frontier,
            storage,
            metrics,
            http,
            seed_urls,
            user_agent,
            session: tokio::sync::Mutex::new(None),
        }
    }

    /// Feed a discovered URL into the frontier.
    ///
    /// Returns whether the URL was accepted (not already queued or visited).
    pub fn enqueue(&self, url: &str, priority: i32) -> bool {
        let accepted = self.frontier.enqueue(url, priority);
        if accepted {
            debug!("Enqueued {url} at priority {priority}");
        }
        accepted
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<PageStore> {
        &self.storage
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    #[must_use]
    pub fn seed_urls(&self) -> &[String] {
        &self.seed_urls
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Publish the shared renderer session.
    pub async fn publish_session(&self, session: Arc<dyn RendererSession>) {
        *self.session.lock().await = Some(session);
    }

    /// The shared renderer session, if a feature has published one.
    pub async fn session(&self) -> Option<Arc<dyn RendererSession>> {
        self.session.lock().await.clone()
    }

    /// Drop the shared renderer session.
    pub async fn clear_session(&self) {
        *self.session.lock().await = None;
    }
}
