//! Canopy: a polite, multi-domain web crawler.
//!
//! URLs are discovered through graph expansion from seed URLs, fetched
//! under per-host rate limits that respect robots.txt and adapt to server
//! signals, deduplicated by canonical URL and content fingerprint, and
//! persisted to a content-addressed file layout (HTML, stylesheets,
//! full-page and component screenshots, DOM trees).
//!
//! ```rust,no_run
//! use canopy_crawler::{CrawlMode, CrawlerBuilder};
//!
//! # async fn run() -> Result<(), canopy_crawler::CrawlError> {
//! let crawler = CrawlerBuilder::new(vec!["https://example.com".to_string()])
//!     .max_pages(25)
//!     .with_graph_crawling(CrawlMode::SingleDomain, 3, 100, None, None, None)
//!     .with_default_css_download()
//!     .storage("crawl_data", true)
//!     .build()?;
//!
//! let summary = crawler.crawl().await?;
//! println!("crawled {} pages", summary.pages_crawled);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crawl_engine;
pub mod dedup;
pub mod dom;
pub mod errors;
pub mod features;
pub mod graph;
pub mod monitoring;
pub mod parser;
pub mod politeness;
pub mod renderer;
pub mod storage;
pub mod utils;

pub use config::{CrawlConfig, CrawlerBuilder};
pub use crawl_engine::{CrawlSummary, Crawler, PageResult, ShutdownHandle};
pub use dedup::{canonicalize, DedupManager};
pub use errors::{CrawlError, ErrorKind, RetryPolicy};
pub use features::CrawlerFeature;
pub use graph::{CrawlMode, GraphConfig, LinkInfo};
pub use monitoring::{FinalReport, MetricsCollector};
pub use parser::{parse_html, ParsedPage};
pub use politeness::{RateLimiter, RobotsPolicy};
pub use renderer::{BoundingBox, Renderer, RendererSession, Viewport};
pub use storage::{ArtifactKind, PageStore};

/// Run a crawl from a prepared configuration.
pub async fn crawl(config: CrawlConfig) -> Result<CrawlSummary, CrawlError> {
    let crawler = Crawler::new(config)?;
    crawler.crawl().await
}
