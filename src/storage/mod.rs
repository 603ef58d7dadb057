//! Content-addressed artifact storage
//!
//! Artifacts are organized by host and page identifier:
//!
//! ```text
//! <root>/<host>/<urlID>/metadata.json
//! <root>/<host>/<urlID>/html(.gz)
//! <root>/<host>/<urlID>/screenshot(.webp|.png)
//! <root>/<host>/<urlID>/dom_trees(.json[.gz])
//! <root>/<host>/<urlID>/css/<name>(.css[.gz])
//! <root>/<host>/<urlID>/component_screenshots/<name>(.webp|.png)
//! ```
//!
//! `host` is lowercased with `www.` stripped and `:` replaced by `_`;
//! `urlID` is the 12-hex-char MD5 prefix of the URL. Every path is
//! deterministic for a given URL, so re-runs overwrite in place.

pub mod compression;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, error};
use serde::Serialize;

use crate::utils::{host_dir_name, page_id};
use compression::{gzip_bytes, recompress_webp};

/// The artifact families a page can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Html,
    Css,
    Json,
    Screenshot,
    ComponentScreenshot,
    DomTree,
}

impl ArtifactKind {
    /// Base filename (or subdirectory default) for the artifact.
    #[must_use]
    const fn base_name(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "styles",
            Self::Json => "json",
            Self::Screenshot => "screenshot",
            Self::ComponentScreenshot => "component",
            Self::DomTree => "dom_trees",
        }
    }

    #[must_use]
    const fn extension(self, compress: bool) -> &'static str {
        match (self, compress) {
            (Self::Html, true) => ".html.gz",
            (Self::Html, false) => ".html",
            (Self::Css, true) => ".css.gz",
            (Self::Css, false) => ".css",
            (Self::Json | Self::DomTree, true) => ".json.gz",
            (Self::Json | Self::DomTree, false) => ".json",
            (Self::Screenshot | Self::ComponentScreenshot, true) => ".webp",
            (Self::Screenshot | Self::ComponentScreenshot, false) => ".png",
        }
    }

    const fn is_text(self) -> bool {
        matches!(self, Self::Html | Self::Css | Self::Json | Self::DomTree)
    }

    const fn is_image(self) -> bool {
        matches!(self, Self::Screenshot | Self::ComponentScreenshot)
    }

    /// Subdirectory for multi-file artifact families.
    const fn subdirectory(self) -> Option<&'static str> {
        match self {
            Self::Css => Some("css"),
            Self::ComponentScreenshot => Some("component_screenshots"),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct PageMetadata<'a> {
    url: &'a str,
    url_hash: String,
    host: String,
    crawled_at: String,
}

/// Page-addressed artifact store with optional compression.
pub struct PageStore {
    root: PathBuf,
    compress: bool,
}

impl PageStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            root: root.into(),
            compress,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn compress(&self) -> bool {
        self.compress
    }

    /// Directory that holds every artifact for a URL.
    #[must_use]
    pub fn page_dir(&self, url: &str) -> PathBuf {
        self.root.join(host_dir_name(url)).join(page_id(url))
    }

    /// Deterministic path for an artifact of the given kind.
    #[must_use]
    pub fn artifact_path(&self, url: &str, kind: ArtifactKind, suffix: Option<&str>) -> PathBuf {
        let mut dir = self.page_dir(url);
        if let Some(sub) = kind.subdirectory() {
            dir = dir.join(sub);
        }

        let stem = match suffix {
            Some(suffix) if kind.subdirectory().is_some() => {
                sanitize_filename::sanitize(suffix)
            }
            _ => kind.base_name().to_string(),
        };

        dir.join(format!("{stem}{}", kind.extension(self.compress)))
    }

    /// Persist an artifact, creating directories on demand.
    ///
    /// Text kinds are gzip-compressed and image kinds are recompressed to
    /// WebP when compression is enabled. Returns the final path.
    pub async fn save(
        &self,
        url: &str,
        content: Vec<u8>,
        kind: ArtifactKind,
        suffix: Option<&str>,
    ) -> Result<PathBuf> {
        let path = self.artifact_path(url, kind, suffix);

        let payload = if self.compress {
            encode_for_storage(content, kind).await?
        } else {
            content
        };

        let parent = path
            .parent()
            .context("artifact path has no parent directory")?;
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;

        tokio::fs::write(&path, payload)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        debug!("Saved {kind:?} artifact for {url} at {}", path.display());
        Ok(path)
    }

    /// Write `metadata.json` for a page: URL, hash, host, crawl timestamp.
    pub async fn save_page_metadata(&self, url: &str) -> Result<PathBuf> {
        let metadata = PageMetadata {
            url,
            url_hash: page_id(url),
            host: host_dir_name(url),
            crawled_at: Utc::now().to_rfc3339(),
        };

        let path = self.page_dir(url).join("metadata.json");
        let parent = path
            .parent()
            .context("metadata path has no parent directory")?;
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let json = serde_json::to_vec_pretty(&metadata)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(path)
    }

    /// Serialize a value to JSON at an arbitrary path under the root.
    pub async fn save_report<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.root.join(name);
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let json = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

async fn encode_for_storage(content: Vec<u8>, kind: ArtifactKind) -> Result<Vec<u8>> {
    if kind.is_text() {
        tokio::task::spawn_blocking(move || gzip_bytes(&content))
            .await
            .context("compression task panicked")?
    } else if kind.is_image() {
        let result = tokio::task::spawn_blocking(move || (recompress_webp(&content), content))
            .await
            .context("compression task panicked")?;
        match result {
            (Ok(webp), _) => Ok(webp),
            (Err(e), original) => {
                // A capture that fails to re-encode is still worth keeping
                error!("WebP recompression failed, storing original bytes: {e}");
                Ok(original)
            }
        }
    } else {
        Ok(content)
    }
}
