//! CSS download feature
//!
//! Fetches the external stylesheets a page references (capped per page) and
//! stores them under the page's `css/` subcollection, named by the
//! stylesheet URL's path stem.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use url::Url;

use super::CrawlerFeature;
use crate::crawl_engine::context::CrawlContext;
use crate::crawl_engine::fetch::PageResult;
use crate::storage::ArtifactKind;
use crate::utils::constants::CSS_TIMEOUT_SECS;

/// Downloads referenced stylesheets for each crawled page.
pub struct CssDownloadFeature {
    max_css_files: usize,
    downloaded: AtomicU64,
}

impl CssDownloadFeature {
    #[must_use]
    pub fn new(max_css_files: usize) -> Self {
        Self {
            max_css_files,
            downloaded: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl CrawlerFeature for CssDownloadFeature {
    fn name(&self) -> &'static str {
        "css_download"
    }

    async fn initialize(&self, _ctx: &CrawlContext) -> Result<()> {
        info!("CSS download feature initialized (cap {})", self.max_css_files);
        Ok(())
    }

    async fn before_crawl(&self, _ctx: &CrawlContext) -> Result<()> {
        Ok(())
    }

    async fn process_url(&self, url: &str, result: &PageResult, ctx: &CrawlContext) -> Result<()> {
        if result.error.is_some() {
            return Ok(());
        }
        let Some(parsed) = &result.parsed else {
            return Ok(());
        };
        if parsed.css_links.is_empty() {
            return Ok(());
        }

        info!("Found {} CSS files for {url}", parsed.css_links.len());

        for css_url in parsed.css_links.iter().take(self.max_css_files) {
            if let Err(e) = self.download_css(css_url, url, ctx).await {
                warn!("Failed to download CSS {css_url}: {e:#}");
            }
        }
        Ok(())
    }

    async fn finalize(&self, _ctx: &CrawlContext) -> Result<()> {
        info!(
            "CSS download feature completed - downloaded {} files",
            self.downloaded.load(Ordering::Relaxed)
        );
        Ok(())
    }
}

impl CssDownloadFeature {
    async fn download_css(&self, css_url: &str, page_url: &str, ctx: &CrawlContext) -> Result<()> {
        let response = ctx
            .http()
            .get(css_url)
            .timeout(Duration::from_secs(CSS_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("CSS download returned HTTP {}", response.status());
        }

        let body = response.text().await?;
        let name = css_file_name(css_url);

        // Stored under the page that referenced the stylesheet
        ctx.storage()
            .save(page_url, body.into_bytes(), ArtifactKind::Css, Some(&name))
            .await?;

        self.downloaded.fetch_add(1, Ordering::Relaxed);
        debug!("Downloaded CSS {name} from {css_url}");
        Ok(())
    }
}

/// Artifact name for a stylesheet: the URL path's stem, falling back to a
/// hash of the URL when the path has none.
#[must_use]
pub fn css_file_name(css_url: &str) -> String {
    let stem = Url::parse(css_url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.last().map(String::from))
        })
        .filter(|name| !name.is_empty())
        .map(|name| name.strip_suffix(".css").map(String::from).unwrap_or(name));

    let raw = stem.unwrap_or_else(|| format!("{:x}", md5::compute(css_url.as_bytes()))[..12].to_string());

    raw.replace(['.', '/', '\\', ' ', ':'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_name_from_path_stem() {
        assert_eq!(css_file_name("https://a.test/styles/main.css"), "main");
        assert_eq!(css_file_name("https://a.test/lib/theme.min.css"), "theme_min");
    }

    #[test]
    fn test_css_name_falls_back_to_hash() {
        let name = css_file_name("https://a.test/");
        assert_eq!(name.len(), 12);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_css_name_is_filesystem_safe() {
        let name = css_file_name("https://a.test/a b/weird:name.css?v=2");
        assert!(!name.contains([' ', ':', '/', '.']));
    }
}
