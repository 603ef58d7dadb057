//! URL and content deduplication
//!
//! Two layers: canonical-URL identity (with a bloom pre-filter in front of
//! the authoritative visited set) and structure-invariant content
//! fingerprints. `DedupManager` combines both into the decisions the crawl
//! loop consumes.

pub mod bloom;
pub mod canonicalizer;
pub mod content_hasher;
pub mod manager;

pub use bloom::BloomFilter;
pub use canonicalizer::{canonicalize, is_equivalent};
pub use content_hasher::{normalize_html, ContentHasher};
pub use manager::{CrawlDecision, DedupManager, DedupStats};
