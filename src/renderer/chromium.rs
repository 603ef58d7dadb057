//! chromiumoxide-backed renderer
//!
//! Finds a system Chrome/Chromium executable, launches it headless, and
//! drives pages over CDP. Element geometry and visibility are read through
//! injected JavaScript; element captures use CDP screenshot clips so no
//! per-element handle juggling is needed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, Viewport as ScreenshotClip,
};
use chromiumoxide::Page;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{BoundingBox, LocatedElement, Renderer, RendererSession, Viewport};

/// Find a Chrome/Chromium executable on the system.
///
/// `CHROMIUM_PATH` overrides the search; otherwise common install locations
/// are probed, then `which`.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        warn!("CHROMIUM_PATH points to non-existent file: {}", path.display());
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for candidate in candidates {
        let path = PathBuf::from(candidate);
        if path.exists() {
            info!("Found browser at {}", path.display());
            return Ok(path);
        }
    }

    for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
        if let Ok(output) = Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    info!("Found browser via which: {found}");
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    Err(anyhow!("no Chrome/Chromium executable found"))
}

struct BrowserHandle {
    browser: Browser,
    handler_task: JoinHandle<()>,
    user_data_dir: PathBuf,
}

/// Renderer backed by a locally launched Chromium.
pub struct ChromiumRenderer {
    headless: bool,
    state: Mutex<Option<BrowserHandle>>,
}

impl ChromiumRenderer {
    #[must_use]
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            state: Mutex::new(None),
        }
    }

    async fn launch(&self, viewport: Viewport) -> Result<BrowserHandle> {
        let executable = find_browser_executable()?;

        let user_data_dir =
            std::env::temp_dir().join(format!("canopy_chrome_{}", std::process::id()));
        std::fs::create_dir_all(&user_data_dir).context("failed to create user data directory")?;

        let mut config_builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .window_size(viewport.width, viewport.height)
            .user_data_dir(user_data_dir.clone())
            .chrome_executable(executable)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-notifications")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--mute-audio")
            .arg("--hide-scrollbars");

        config_builder = if self.headless {
            config_builder.headless_mode(HeadlessMode::default())
        } else {
            config_builder.with_head()
        };

        let config = config_builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;

        // Drive the CDP connection for the lifetime of the browser
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {e}");
                }
            }
        });

        Ok(BrowserHandle {
            browser,
            handler_task,
            user_data_dir,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open(&self, viewport: Viewport, user_agent: &str) -> Result<Arc<dyn RendererSession>> {
        let mut state = self.state.lock().await;
        if state.is_none() {
            *state = Some(self.launch(viewport).await?);
        }

        let handle = state
            .as_ref()
            .ok_or_else(|| anyhow!("browser launch did not produce a handle"))?;

        let page = handle
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        page.execute(SetUserAgentOverrideParams {
            user_agent: user_agent.to_string(),
            accept_language: None,
            platform: None,
            user_agent_metadata: None,
        })
        .await
        .context("failed to set user agent")?;

        Ok(Arc::new(ChromiumSession { page }))
    }

    async fn close(&self) -> Result<()> {
        let Some(mut handle) = self.state.lock().await.take() else {
            return Ok(());
        };

        if let Err(e) = handle.browser.close().await {
            warn!("Failed to close browser: {e}");
        }
        if let Err(e) = handle.browser.wait().await {
            warn!("Failed to wait for browser exit: {e}");
        }
        handle.handler_task.abort();

        if let Err(e) = std::fs::remove_dir_all(&handle.user_data_dir) {
            debug!("Could not remove browser data directory: {e}");
        }
        Ok(())
    }
}

/// One CDP-driven page.
pub struct ChromiumSession {
    page: Page,
}

#[derive(Deserialize)]
struct JsRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    visible: bool,
}

const LOCATE_SCRIPT: &str = r"
(selector) => {
    const out = [];
    for (const el of document.querySelectorAll(selector)) {
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        out.push({
            x: rect.x + window.scrollX,
            y: rect.y + window.scrollY,
            width: rect.width,
            height: rect.height,
            visible: style.display !== 'none'
                && style.visibility !== 'hidden'
                && rect.width > 0 && rect.height > 0,
        });
    }
    return out;
}";

const FIRST_MATCH_SCRIPT: &str = r"
(selectors) => {
    const out = {};
    for (const selector of selectors) {
        let el = null;
        try { el = document.querySelector(selector); } catch (e) { continue; }
        if (!el) continue;
        const rect = el.getBoundingClientRect();
        out[selector] = {
            x: rect.x + window.scrollX,
            y: rect.y + window.scrollY,
            width: rect.width,
            height: rect.height,
            visible: true,
        };
    }
    return out;
}";

impl ChromiumSession {
    async fn evaluate_function<T: serde::de::DeserializeOwned>(
        &self,
        script: &str,
        argument: serde_json::Value,
    ) -> Result<T> {
        // Inline the argument so the snippet is a plain expression call
        let call = format!("({script})({argument})");
        let result = self
            .page
            .evaluate(call)
            .await
            .context("failed to evaluate script")?;
        result
            .into_value::<T>()
            .map_err(|e| anyhow!("failed to read script result: {e}"))
    }
}

#[async_trait]
impl RendererSession for ChromiumSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, async {
            self.page
                .goto(url)
                .await
                .map_err(|e| anyhow!("navigation failed: {e}"))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| anyhow!("page load failed: {e}"))?;
            Ok::<(), anyhow::Error>(())
        })
        .await
        .map_err(|_| anyhow!("navigation timeout after {}s for {url}", timeout.as_secs()))?
    }

    async fn dismiss_consent(&self, selectors: &[&str]) {
        for selector in selectors {
            let Ok(element) = self.page.find_element(*selector).await else {
                continue;
            };
            match element.click().await {
                Ok(_) => {
                    debug!("Dismissed consent element {selector}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    break;
                }
                Err(e) => debug!("Consent click on {selector} failed: {e}"),
            }
        }
    }

    async fn full_page_screenshot(&self) -> Result<Vec<u8>> {
        let params = CaptureScreenshotParams {
            format: Some(CaptureScreenshotFormat::Png),
            capture_beyond_viewport: Some(true),
            ..Default::default()
        };
        self.page
            .screenshot(params)
            .await
            .map_err(|e| anyhow!("failed to capture screenshot: {e}"))
    }

    async fn body(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| anyhow!("failed to read page content: {e}"))
    }

    async fn locate(&self, selector: &str) -> Result<Vec<LocatedElement>> {
        let rects: Vec<JsRect> = self
            .evaluate_function(LOCATE_SCRIPT, serde_json::json!(selector))
            .await?;
        Ok(rects
            .into_iter()
            .map(|r| LocatedElement {
                rect: BoundingBox {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                },
                visible: r.visible,
            })
            .collect())
    }

    async fn bounding_boxes(&self, selectors: &[String]) -> Result<HashMap<String, BoundingBox>> {
        let rects: HashMap<String, JsRect> = self
            .evaluate_function(FIRST_MATCH_SCRIPT, serde_json::json!(selectors))
            .await?;
        Ok(rects
            .into_iter()
            .map(|(selector, r)| {
                (
                    selector,
                    BoundingBox {
                        x: r.x,
                        y: r.y,
                        width: r.width,
                        height: r.height,
                    },
                )
            })
            .collect())
    }

    async fn element_screenshot(&self, rect: &BoundingBox) -> Result<Vec<u8>> {
        let params = CaptureScreenshotParams {
            format: Some(CaptureScreenshotFormat::Png),
            capture_beyond_viewport: Some(true),
            clip: Some(ScreenshotClip {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                scale: 1.0,
            }),
            ..Default::default()
        };
        self.page
            .screenshot(params)
            .await
            .map_err(|e| anyhow!("failed to capture element screenshot: {e}"))
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| anyhow!("failed to close page: {e}"))
    }
}
