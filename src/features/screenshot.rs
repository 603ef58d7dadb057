//! Full-page screenshot feature
//!
//! Opens one renderer session for the whole crawl, publishes it on the
//! crawl context for downstream features, and captures a full-page PNG of
//! every successfully fetched URL. Navigation re-renders the page in the
//! browser; a short settle sleep and best-effort consent dismissal run
//! before the capture.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};

use super::CrawlerFeature;
use crate::crawl_engine::context::CrawlContext;
use crate::crawl_engine::fetch::PageResult;
use crate::renderer::{ChromiumRenderer, Renderer, Viewport};
use crate::storage::ArtifactKind;
use crate::utils::constants::{NAVIGATION_TIMEOUT_SECS, SCREENSHOT_SETTLE_SECS};

/// Selectors tried, in order, to dismiss cookie/consent banners.
const CONSENT_SELECTORS: [&str; 6] = [
    r#"button[id*="accept"]"#,
    r#"button[class*="accept"]"#,
    r#"button[id*="cookie"]"#,
    r#"button[class*="cookie"]"#,
    r#"[id*="cookieConsent"] button"#,
    ".cookie-banner button",
];

/// Captures a full-page screenshot per crawled URL.
pub struct ScreenshotFeature {
    renderer: Arc<dyn Renderer>,
    viewport: Viewport,
}

impl ScreenshotFeature {
    #[must_use]
    pub fn new(viewport: Viewport, headless: bool) -> Self {
        Self {
            renderer: Arc::new(ChromiumRenderer::new(headless)),
            viewport,
        }
    }

    /// Use a specific renderer implementation (tests, alternative browsers).
    #[must_use]
    pub fn with_renderer(renderer: Arc<dyn Renderer>, viewport: Viewport) -> Self {
        Self { renderer, viewport }
    }
}

#[async_trait]
impl CrawlerFeature for ScreenshotFeature {
    fn name(&self) -> &'static str {
        "screenshot"
    }

    async fn initialize(&self, _ctx: &CrawlContext) -> Result<()> {
        info!("Screenshot feature initialized ({}x{})", self.viewport.width, self.viewport.height);
        Ok(())
    }

    async fn before_crawl(&self, ctx: &CrawlContext) -> Result<()> {
        info!("Starting browser for screenshots");
        let session = self
            .renderer
            .open(self.viewport, ctx.user_agent())
            .await
            .context("failed to open renderer session")?;
        ctx.publish_session(session).await;
        info!("Screenshot feature ready");
        Ok(())
    }

    async fn process_url(&self, url: &str, result: &PageResult, ctx: &CrawlContext) -> Result<()> {
        if !result.is_success() {
            warn!("Skipping screenshot for {url}: {:?}", result.error);
            return Ok(());
        }

        let Some(session) = ctx.session().await else {
            anyhow::bail!("renderer session not available");
        };

        session
            .navigate(url, Duration::from_secs(NAVIGATION_TIMEOUT_SECS))
            .await?;
        // Let lazy-loaded content and banners settle before capturing
        tokio::time::sleep(Duration::from_secs(SCREENSHOT_SETTLE_SECS)).await;
        session.dismiss_consent(&CONSENT_SELECTORS).await;

        let pixels = session.full_page_screenshot().await?;
        ctx.storage()
            .save(url, pixels, ArtifactKind::Screenshot, None)
            .await?;

        Ok(())
    }

    async fn finalize(&self, ctx: &CrawlContext) -> Result<()> {
        info!("Closing browser");
        if let Some(session) = ctx.session().await {
            if let Err(e) = session.close().await {
                warn!("Error closing renderer session: {e:#}");
            }
        }
        ctx.clear_session().await;
        if let Err(e) = self.renderer.close().await {
            warn!("Error closing renderer: {e:#}");
        }
        info!("Screenshot feature cleaned up");
        Ok(())
    }
}
