//! Renderer adapter
//!
//! The crawler's contract with a headless browser. Features depend only on
//! the [`Renderer`] and [`RendererSession`] traits; the chromiumoxide
//! implementation lives in [`chromium`] and nothing outside that module
//! assumes a particular browser.

pub mod chromium;

pub use chromium::ChromiumRenderer;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Viewport dimensions for a renderer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: crate::utils::DEFAULT_VIEWPORT_WIDTH,
            height: crate::utils::DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

/// Axis-aligned element geometry in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Whether the box covers any area at all.
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Integer origin used as the component-screenshot index key.
    #[must_use]
    pub fn origin_key(&self) -> (i64, i64) {
        (self.x as i64, self.y as i64)
    }
}

/// One element matched by a selector, in render order.
#[derive(Debug, Clone, Copy)]
pub struct LocatedElement {
    pub rect: BoundingBox,
    pub visible: bool,
}

/// A live page in a headless renderer.
#[async_trait]
pub trait RendererSession: Send + Sync {
    /// Navigate to a URL and wait for the network to go idle.
    ///
    /// Fails on navigation errors and on timeout.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Best-effort dismissal of consent banners; never fails.
    async fn dismiss_consent(&self, selectors: &[&str]);

    /// Full-page PNG capture.
    async fn full_page_screenshot(&self) -> Result<Vec<u8>>;

    /// Serialized post-render DOM.
    async fn body(&self) -> Result<String>;

    /// All elements matching a selector, in render order.
    async fn locate(&self, selector: &str) -> Result<Vec<LocatedElement>>;

    /// Bounding box of the first match for each selector.
    async fn bounding_boxes(&self, selectors: &[String]) -> Result<HashMap<String, BoundingBox>>;

    /// PNG capture clipped to a page-coordinate rectangle.
    async fn element_screenshot(&self, rect: &BoundingBox) -> Result<Vec<u8>>;

    /// Release the page.
    async fn close(&self) -> Result<()>;
}

/// Factory for renderer sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Start the renderer and open one session.
    async fn open(&self, viewport: Viewport, user_agent: &str) -> Result<Arc<dyn RendererSession>>;

    /// Shut the renderer down.
    async fn close(&self) -> Result<()>;
}
